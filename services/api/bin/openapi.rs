use govi_api::router::ApiDoc;
use utoipa::OpenApi;

const SPEC_PATH: &str = "openapi.json";

/// Writes the generated OpenAPI specification to `openapi.json`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(SPEC_PATH, spec_json)?;
    Ok(())
}
