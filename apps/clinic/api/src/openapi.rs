use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `bearer_auth` scheme referenced by the domain paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Clinic API",
        version = "0.1.0",
        description = "Patients, visits, pharmacy stock and counter sales, and staff accounts"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/v1/auth", api = domain_users::AuthApiDoc),
        (path = "/v1/admin", api = domain_users::ApiDoc),
        (path = "/v1", api = domain_patients::ApiDoc),
        (path = "/v1", api = domain_patients::VisitApiDoc),
        (path = "/v1/pharmacy", api = domain_pharmacy::ApiDoc)
    )
)]
pub struct ApiDoc;
