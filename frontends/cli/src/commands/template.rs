// Starter template with menus around the page slot

use anyhow::Result;

use canvas_api::Document;
use canvas_format::serialize_pretty;

pub fn run(menu: &str, footer: &str) -> Result<String> {
    let template = Document::default_template(menu, footer)?;
    Ok(serialize_pretty(&template)?)
}
