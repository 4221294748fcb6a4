use utoipa::OpenApi;

use crate::errors::ErrorBody;
use crate::filtering::{PageLinks, PageRef};
use crate::results::{ItemEnvelope, ResultEnvelope};

/// Base OpenAPI document; resource paths are added as the routers are nested.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "campdir",
        description = "Directory of training programs, their courses and reviews."
    ),
    components(schemas(ResultEnvelope, ItemEnvelope, PageLinks, PageRef, ErrorBody)),
    tags(
        (name = "programs", description = "Training programs, radius search and nested children"),
        (name = "courses", description = "Courses offered by programs"),
        (name = "reviews", description = "Reviews of programs"),
        (name = "users", description = "Registered users")
    )
)]
pub struct ApiDoc;
