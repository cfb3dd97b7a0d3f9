//! Runs a whole conversion: glyph sources to SVG font, TTF, EOT, WOFF,
//! CSS and HTML, each stage reading what the previous one wrote to disk.
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{
    config::Config,
    convertors::{
        eot,
        svgfont::{self, AssemblyOptions, SvgFontAssembler},
        ttf, woff,
    },
    emitters::{
        css::{self, FontReferences},
        html,
    },
    glyph::SourceGlyph,
    paths, Glyphs2FontError,
};

/// One conversion run, bound to its configuration file and working directory.
struct Run<'a> {
    config: &'a Config,
    config_file: &'a Path,
    cwd: PathBuf,
    scratch_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl Run<'_> {
    /// Where to read or write `target`. The working-directory-relative form
    /// is joined back onto `cwd`, which need not be the process's.
    fn io_path(&self, target: &Path) -> PathBuf {
        self.cwd
            .join(paths::resolve_for_io_from(target, self.config_file, &self.cwd))
    }

    /// How the artifact configured at `referencing` refers to `target`.
    fn reference(&self, target: &Path, referencing: &Path) -> String {
        paths::resolve_for_reference(
            &paths::config_anchored(target, self.config_file, &self.cwd),
            &paths::config_anchored(referencing, self.config_file, &self.cwd),
        )
    }

    fn write(&mut self, path: &Path, contents: impl AsRef<[u8]>) -> Result<(), Glyphs2FontError> {
        std::fs::write(path, contents).map_err(|e| Glyphs2FontError::io(path, e))?;
        log::info!("Wrote {}", path.display());
        self.written.push(path.to_path_buf());
        Ok(())
    }

    /// The configured destination, or a scratch file that lives as long as
    /// `scratch`.
    fn destination(
        &self,
        configured: Option<&Path>,
        suffix: &str,
        scratch: &mut Option<NamedTempFile>,
    ) -> Result<PathBuf, Glyphs2FontError> {
        if let Some(target) = configured {
            return Ok(self.io_path(target));
        }
        let file = tempfile::Builder::new()
            .prefix("glyphs2font-")
            .suffix(suffix)
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| Glyphs2FontError::io(&self.scratch_dir, e))?;
        let path = file.path().to_path_buf();
        log::debug!("Using scratch file {}", path.display());
        *scratch = Some(file);
        Ok(path)
    }

    fn assemble_svg_font(&self) -> Result<String, Glyphs2FontError> {
        let mut assembler = SvgFontAssembler::new(AssemblyOptions::from(&self.config.font));
        for spec in &self.config.glyphs {
            let source = self.io_path(&spec.glyph);
            let glyph = SourceGlyph::load(&source, spec.name.clone(), vec![spec.character()?])?;
            assembler.add_glyph(glyph);
        }
        assembler.pad_to_minimum()?;
        assembler.finish()
    }

    fn emit_css(&mut self, css_target: &Path) -> Result<(), Glyphs2FontError> {
        let font = &self.config.font;
        let reference = |target: &Option<PathBuf>| {
            target
                .as_deref()
                .map(|target| self.reference(target, css_target))
        };
        let references = FontReferences {
            eot: reference(&font.eot),
            woff: reference(&font.woff),
            svg: reference(&font.svg),
            ttf: reference(&font.ttf),
        };
        let stylesheet = css::render(self.config, &references);
        let path = self.io_path(css_target);
        self.write(&path, stylesheet)
    }

    fn emit_html(&mut self, html_target: &Path) -> Result<(), Glyphs2FontError> {
        let stylesheet = self
            .config
            .font
            .css
            .as_deref()
            .map(|css_target| self.reference(css_target, html_target));
        let page = html::render(self.config, stylesheet.as_deref());
        let path = self.io_path(html_target);
        self.write(&path, page)
    }
}

/// Converts everything the configuration at `config_file` asks for and
/// returns the paths written.
///
/// Scratch intermediates are removed before returning, whether the run
/// succeeded or not. Artifacts written before a failure stay on disk.
pub fn run(config_file: &Path) -> Result<Vec<PathBuf>, Glyphs2FontError> {
    let config = Config::load(config_file)?;
    let cwd = std::env::current_dir().map_err(|e| Glyphs2FontError::io(".", e))?;
    run_config(&config, config_file, &cwd)
}

/// [`run`] for an already loaded configuration and an explicit, absolute
/// working directory that relative `config_file` paths start from.
pub fn run_config(
    config: &Config,
    config_file: &Path,
    cwd: &Path,
) -> Result<Vec<PathBuf>, Glyphs2FontError> {
    run_with_scratch_dir(config, config_file, cwd, &std::env::temp_dir())
}

fn run_with_scratch_dir(
    config: &Config,
    config_file: &Path,
    cwd: &Path,
    scratch_dir: &Path,
) -> Result<Vec<PathBuf>, Glyphs2FontError> {
    let mut run = Run {
        config,
        config_file,
        cwd: cwd.to_path_buf(),
        scratch_dir: scratch_dir.to_path_buf(),
        written: vec![],
    };
    let font = &config.font;
    let mut svg_scratch = None;
    let mut ttf_scratch = None;

    let svg_text = run.assemble_svg_font()?;
    let svg_path = run.destination(font.svg.as_deref(), ".svg", &mut svg_scratch)?;
    if svg_scratch.is_some() {
        std::fs::write(&svg_path, &svg_text).map_err(|e| Glyphs2FontError::io(&svg_path, e))?;
    } else {
        run.write(&svg_path, &svg_text)?;
    }

    let svg_text =
        std::fs::read_to_string(&svg_path).map_err(|e| Glyphs2FontError::io(&svg_path, e))?;
    let ttf_binary = ttf::compile(&svgfont::parse(&svg_text)?)?;
    let ttf_path = run.destination(font.ttf.as_deref(), ".ttf", &mut ttf_scratch)?;
    if ttf_scratch.is_some() {
        std::fs::write(&ttf_path, &ttf_binary).map_err(|e| Glyphs2FontError::io(&ttf_path, e))?;
    } else {
        run.write(&ttf_path, &ttf_binary)?;
    }

    if font.eot.is_some() || font.woff.is_some() {
        let ttf_binary =
            std::fs::read(&ttf_path).map_err(|e| Glyphs2FontError::io(&ttf_path, e))?;
        if let Some(target) = &font.eot {
            let path = run.io_path(target);
            run.write(&path, eot::from_ttf(&ttf_binary)?)?;
        }
        if let Some(target) = &font.woff {
            let path = run.io_path(target);
            run.write(&path, woff::from_ttf(&ttf_binary)?)?;
        }
    }

    if let Some(target) = &font.css {
        run.emit_css(target)?;
    }
    if let Some(target) = &font.html {
        run.emit_html(target)?;
    }

    drop(ttf_scratch);
    drop(svg_scratch);
    Ok(run.written)
}
