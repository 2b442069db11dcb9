use crate::revapatch::config::AppCatalog;
use inquire::error::InquireResult;
use inquire::ui::{Attributes, Color, RenderConfig, Styled};
use inquire::{InquireError, MultiSelect};

fn revapatch_inquire_style() -> RenderConfig<'static> {
    let style: Styled<&'static str> = Styled::default()
        .with_fg(Color::LightMagenta)
        .with_attr(Attributes::BOLD);

    RenderConfig::default()
        .with_unselected_checkbox(style.clone().with_content("{ }"))
        .with_selected_checkbox(style.clone().with_content("{X}"))
}

/// Lets the user tick apps from the catalog. An empty selection or a
/// cancelled prompt yields no apps.
pub fn pick_apps(catalog: &AppCatalog) -> InquireResult<Vec<String>> {
    inquire::set_global_render_config(revapatch_inquire_style());

    let names: Vec<&str> = catalog.names().collect();
    let picked = MultiSelect::new("Select the apps to download and patch:", names)
        .with_page_size(15)
        .prompt();

    match picked {
        Ok(apps) => Ok(apps.into_iter().map(str::to_string).collect()),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
