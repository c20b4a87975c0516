use crate::output::print_json;
use brain_core::executor;
use brain_core::pipeline::CancelToken;
use brain_core::registry;
use brain_core::source::TemplateSource;

pub fn run(
    source: &TemplateSource,
    tools: &[String],
    scope: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let names: Vec<String> = if tools.is_empty() {
        registry::all()
            .iter()
            .map(|installer| installer.name().to_string())
            .collect()
    } else {
        tools.to_vec()
    };
    anyhow::ensure!(!names.is_empty(), "no targets registered");

    let results = executor::install_tools(&CancelToken::new(), &names, source, scope)?;

    if json {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            name: &'a str,
            ok: bool,
            error: Option<String>,
        }
        let entries: Vec<Entry> = results
            .iter()
            .map(|result| Entry {
                name: &result.name,
                ok: result.is_ok(),
                error: result.error.as_ref().map(|e| e.to_string()),
            })
            .collect();
        print_json(&entries)?;
    } else {
        for result in &results {
            match &result.error {
                None => println!("installed {}", result.name),
                Some(error) => println!("failed {}: {error}", result.name),
            }
        }
    }

    let failed = executor::failures(results);
    anyhow::ensure!(
        failed.is_empty(),
        "{} of {} target(s) failed to install",
        failed.len(),
        names.len()
    );
    Ok(())
}
