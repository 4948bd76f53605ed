//! MCP Server implementation for Nano Banana.
//!
//! This module provides the MCP server handler that exposes:
//! - `configure_credential` to set and persist the Gemini API key
//! - `generate_image` for text-to-image generation
//! - `edit_image` and `continue_editing` for image editing and edit chaining
//! - `get_last_image_info` and `get_configuration_status` for session queries
//! - The `nanobanana://models` resource

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use nanobanana_mcp_common::error::{Error, ErrorKind};
use rmcp::{
    model::{
        CallToolResult, Content, ErrorCode, JsonObject, ListResourcesResult, ListToolsResult,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credentials::LoadReport;
use crate::handler::NanoBananaHandler;
use crate::resources;

/// Tool names.
pub const CONFIGURE_CREDENTIAL: &str = "configure_credential";
pub const GENERATE_IMAGE: &str = "generate_image";
pub const EDIT_IMAGE: &str = "edit_image";
pub const CONTINUE_EDITING: &str = "continue_editing";
pub const GET_LAST_IMAGE_INFO: &str = "get_last_image_info";
pub const GET_CONFIGURATION_STATUS: &str = "get_configuration_status";

/// MCP Server for Gemini image generation.
///
/// All tool calls are serialized through one mutex around the handler.
#[derive(Clone)]
pub struct NanoBananaServer {
    handler: Arc<Mutex<NanoBananaHandler>>,
}

/// Tool parameters for configure_credential.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureCredentialParams {
    /// Gemini API key
    pub api_key: String,
}

/// Tool parameters for generate_image.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageParams {
    /// Text prompt describing the image to generate
    pub prompt: String,
}

/// Tool parameters for edit_image.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditImageParams {
    /// Path of the image to edit
    pub image_path: String,
    /// Instructions describing the edit
    pub prompt: String,
    /// Optional reference image paths (style or content guidance)
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Tool parameters for continue_editing.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContinueEditingParams {
    /// Instructions describing the next edit of the last image
    pub prompt: String,
    /// Optional reference image paths (style or content guidance)
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Tools without arguments.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

impl NanoBananaServer {
    /// Wrap a handler.
    pub fn new(handler: NanoBananaHandler) -> Self {
        Self {
            handler: Arc::new(Mutex::new(handler)),
        }
    }

    /// Resolve the startup credential. See [`NanoBananaHandler::load_on_startup`].
    pub async fn load_on_startup(&self, env_value: Option<&str>) -> LoadReport {
        self.handler.lock().await.load_on_startup(env_value).await
    }

    /// Run the named tool and return its text output.
    ///
    /// # Errors
    /// `Error::MethodNotFound` for unknown tools, `Error::InvalidInput` for
    /// malformed arguments, and whatever the operation returns.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> Result<String, Error> {
        let mut handler = self.handler.lock().await;

        match name {
            CONFIGURE_CREDENTIAL => {
                let params: ConfigureCredentialParams = parse_args(arguments)?;
                handler
                    .configure_credential(&params.api_key)
                    .await
                    .map(str::to_string)
            }
            GENERATE_IMAGE => {
                let params: GenerateImageParams = parse_args(arguments)?;
                let path = handler.generate_image(&params.prompt).await?;
                Ok(path.display().to_string())
            }
            EDIT_IMAGE => {
                let params: EditImageParams = parse_args(arguments)?;
                let path = handler
                    .edit_image(
                        &PathBuf::from(params.image_path),
                        &params.prompt,
                        &to_paths(params.reference_images),
                    )
                    .await?;
                Ok(path.display().to_string())
            }
            CONTINUE_EDITING => {
                let params: ContinueEditingParams = parse_args(arguments)?;
                let path = handler
                    .continue_editing(&params.prompt, &to_paths(params.reference_images))
                    .await?;
                Ok(path.display().to_string())
            }
            GET_LAST_IMAGE_INFO => handler.last_image_info().await.render(),
            GET_CONFIGURATION_STATUS => Ok(serde_json::to_string(&handler.configuration_status())?),
            other => Err(Error::MethodNotFound(other.to_string())),
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, Error> {
    serde_json::from_value(serde_json::Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| Error::invalid_input(format!("Invalid parameters: {}", e)))
}

fn to_paths(paths: Vec<String>) -> Vec<PathBuf> {
    paths.into_iter().map(PathBuf::from).collect()
}

/// Convert a library error into an MCP error carrying `{"kind": ...}`.
pub fn to_mcp_error(err: &Error) -> McpError {
    let kind = err.kind();
    let code = match kind {
        ErrorKind::InvalidInput => ErrorCode::INVALID_PARAMS,
        ErrorKind::MethodNotFound => ErrorCode::METHOD_NOT_FOUND,
        ErrorKind::PreconditionFailed => ErrorCode::INVALID_REQUEST,
        ErrorKind::IoError
        | ErrorKind::GenerationFailed
        | ErrorKind::ModelUnavailable
        | ErrorKind::InternalError => ErrorCode::INTERNAL_ERROR,
    };
    McpError::new(
        code,
        err.to_string(),
        Some(serde_json::json!({ "kind": kind.as_str() })),
    )
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn tool(name: &'static str, description: &'static str, input_schema: Arc<JsonObject>) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// The six tools exposed by the server.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            CONFIGURE_CREDENTIAL,
            "Set the Gemini API key. The key is kept for this session and saved to \
             .nano-banana-config.json in the working directory.",
            input_schema::<ConfigureCredentialParams>(),
        ),
        tool(
            GENERATE_IMAGE,
            "Generate an image from a text prompt. Returns the path of the saved PNG file.",
            input_schema::<GenerateImageParams>(),
        ),
        tool(
            EDIT_IMAGE,
            "Edit an existing image with a text prompt, optionally guided by reference \
             images. Returns the path of the saved PNG file.",
            input_schema::<EditImageParams>(),
        ),
        tool(
            CONTINUE_EDITING,
            "Apply another edit to the most recently generated or edited image. \
             Returns the path of the saved PNG file.",
            input_schema::<ContinueEditingParams>(),
        ),
        tool(
            GET_LAST_IMAGE_INFO,
            "Describe the most recently saved image: \"none\", or its path, size and \
             modification time.",
            input_schema::<NoParams>(),
        ),
        tool(
            GET_CONFIGURATION_STATUS,
            "Report whether an API key is configured and where it came from.",
            input_schema::<NoParams>(),
        ),
    ]
}

impl ServerHandler for NanoBananaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation and editing server using Gemini image models (Nano Banana). \
                 Configure an API key with configure_credential (or GEMINI_API_KEY), then use \
                 generate_image, edit_image and continue_editing. Results are saved as PNG files."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            info!(tool = %params.name, "Tool call");

            match self.dispatch(params.name.as_ref(), params.arguments).await {
                Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
                Err(e) => {
                    warn!(tool = %params.name, kind = %e.kind(), error = %e, "Tool call failed");
                    Err(to_mcp_error(&e))
                }
            }
        }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing resources");

            let models_resource = rmcp::model::Resource {
                raw: rmcp::model::RawResource {
                    uri: resources::MODELS_URI.to_string(),
                    name: "Image Models".to_string(),
                    title: None,
                    description: Some(
                        "Candidate model order and the registered Gemini image models".to_string(),
                    ),
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                },
                annotations: None,
            };

            Ok(ListResourcesResult {
                resources: vec![models_resource],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = match uri.as_str() {
                resources::MODELS_URI => {
                    let handler = self.handler.lock().await;
                    resources::models_resource_json(handler.resolver().candidates())
                }
                _ => {
                    return Err(McpError::resource_not_found(
                        format!("Unknown resource: {}", uri),
                        None,
                    ));
                }
            };

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}
