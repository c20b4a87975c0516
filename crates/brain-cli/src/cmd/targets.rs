use crate::output::{print_json, print_table};
use brain_core::registry;

pub fn run(json: bool) -> anyhow::Result<()> {
    let installers = registry::all();

    if json {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            name: &'a str,
            display_name: &'a str,
            tool_installed: bool,
            brain_installed: bool,
            scopes: Vec<&'a str>,
            default_scope: &'a str,
        }
        let entries: Vec<Entry> = installers
            .iter()
            .map(|installer| Entry {
                name: installer.name(),
                display_name: installer.display_name(),
                tool_installed: installer.is_tool_installed(),
                brain_installed: installer.is_brain_installed(),
                scopes: installer.scopes(),
                default_scope: installer.scope(),
            })
            .collect();
        return print_json(&entries);
    }

    let rows: Vec<Vec<String>> = installers
        .iter()
        .map(|installer| {
            vec![
                installer.name().to_string(),
                installer.display_name().to_string(),
                yes_no(installer.is_tool_installed()),
                yes_no(installer.is_brain_installed()),
                installer.scopes().join(", "),
            ]
        })
        .collect();
    print_table(&["TARGET", "DISPLAY NAME", "TOOL", "BRAIN", "SCOPES"], rows);
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
