use crate::cli::args::SearchArgs;

pub fn validate(args: &SearchArgs) -> Result<(), String> {
    if let Some(raw) = args.start.as_deref() {
        crate::utils::validate_date(raw).map_err(|e| format!("invalid --start '{raw}': {e}"))?;
    }
    if let Some(raw) = args.end.as_deref() {
        crate::utils::validate_date(raw).map_err(|e| format!("invalid --end '{raw}': {e}"))?;
    }
    if let Some(raw) = args.pick.as_deref() {
        crate::utils::parse_coordinates(raw).map_err(|e| format!("invalid --pick '{raw}': {e}"))?;
    }
    if let Some(raw) = args.hover.as_deref() {
        crate::utils::parse_coordinates(raw)
            .map_err(|e| format!("invalid --hover '{raw}': {e}"))?;
    }
    if let Some(raw) = args.viewport.as_deref() {
        crate::utils::parse_viewport(raw).map_err(|e| format!("invalid --viewport '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json, or geojson"
            ));
        }
    }
    if args.select.is_some() && args.pick.is_some() {
        return Err("use either --select or --pick, not both".to_string());
    }
    Ok(())
}
