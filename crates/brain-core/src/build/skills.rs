use crate::brain_config::BrainConfig;
use crate::bundle::GeneratedFile;
use crate::error::Result;
use crate::paths::SKILLS_DIR;
use crate::prefix::maybe_prefix;
use crate::source::TemplateSource;
use crate::tools_config::Target;

/// Skills phase: each subdirectory of `skills/` is copied verbatim, with
/// only the top-level directory name prefixed.
pub fn build(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<Vec<GeneratedFile>> {
    let prefix_on = target.should_prefix(brain);
    let mut files = Vec::new();
    for entry in src.read_dir(SKILLS_DIR)? {
        if !entry.is_dir {
            continue;
        }
        let out_dir = maybe_prefix(&entry.name, prefix_on);
        let rel = format!("{SKILLS_DIR}/{}", entry.name);
        src.walk_dir(&rel, &mut |inner| {
            files.push(GeneratedFile::new(
                format!("skills/{out_dir}/{inner}"),
                src.read_file(&format!("{rel}/{inner}"))?,
            ));
            Ok(())
        })?;
    }
    Ok(files)
}
