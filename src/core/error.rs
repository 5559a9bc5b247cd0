use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigIdCollision,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    AppNotFound,
    ServerNotFound,

    SshServerInvalid,
    SshIdentityFileNotFound,

    RemoteCommandFailed,

    CheckoutFailed,
    BuildEnvFailed,
    TestsFailed,
    DeployManifestMissing,
    DeployRestartInvalid,

    InternalIoError,
    InternalJsonError,
    InternalYamlError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigIdCollision => "config.id_collision",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::AppNotFound => "app.not_found",
            ErrorCode::ServerNotFound => "server.not_found",

            ErrorCode::SshServerInvalid => "ssh.server_invalid",
            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",

            ErrorCode::CheckoutFailed => "checkout.failed",
            ErrorCode::BuildEnvFailed => "build.env_failed",
            ErrorCode::TestsFailed => "tests.failed",
            ErrorCode::DeployManifestMissing => "deploy.manifest_missing",
            ErrorCode::DeployRestartInvalid => "deploy.restart_invalid",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalYamlError => "internal.yaml_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub similar: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub server_id: String,
    pub identity_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailedDetails {
    pub stage: String,
    pub exit_code: i32,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    fn with_details<T: Serialize>(code: ErrorCode, message: impl Into<String>, details: T) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(code, message, details)
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            MissingArgumentDetails { args },
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        Self::with_details(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                id,
            },
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });
        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn app_not_found(id: impl Into<String>, similar: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::AppNotFound,
            "App not found",
            NotFoundDetails {
                id: id.into(),
                similar,
            },
        )
        .with_hint("Run 'pullman app list' to see configured apps")
    }

    pub fn server_not_found(id: impl Into<String>, similar: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::ServerNotFound,
            "Server not found",
            NotFoundDetails {
                id: id.into(),
                similar,
            },
        )
        .with_hint("Run 'pullman server list' to see configured servers")
    }

    pub fn ssh_server_invalid(server_id: impl Into<String>, missing_fields: Vec<String>) -> Self {
        let server_id: String = server_id.into();
        let details = serde_json::json!({
            "serverId": server_id,
            "missingFields": missing_fields,
        });
        Self::new(
            ErrorCode::SshServerInvalid,
            "Server is not properly configured",
            details,
        )
    }

    pub fn ssh_identity_file_not_found(
        server_id: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        Self::with_details(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            SshIdentityFileNotFoundDetails {
                server_id: server_id.into(),
                identity_file: identity_file.into(),
            },
        )
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        Self::with_details(
            ErrorCode::RemoteCommandFailed,
            "Remote command failed",
            details,
        )
    }

    pub fn checkout_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::CheckoutFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn build_env_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::BuildEnvFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn tests_failed(exit_code: i32, output: String) -> Self {
        Self::with_details(
            ErrorCode::TestsFailed,
            "Test suite failed",
            StageFailedDetails {
                stage: "test".to_string(),
                exit_code,
                output,
            },
        )
    }

    pub fn deploy_manifest_missing(manifest: impl Into<String>) -> Self {
        let manifest: String = manifest.into();
        Self::new(
            ErrorCode::DeployManifestMissing,
            format!("ERROR: {} not found!", manifest),
            serde_json::json!({ "manifest": manifest }),
        )
    }

    pub fn deploy_restart_invalid(app_id: impl Into<String>) -> Self {
        let app_id: String = app_id.into();
        Self::new(
            ErrorCode::DeployRestartInvalid,
            "App has no restart strategy configured",
            serde_json::json!({ "appId": app_id }),
        )
        .with_hint("Set 'serviceUnit' for a systemd restart, or 'startCommand' for a detached process")
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let path: String = path.into();
        let details = serde_json::json!({
            "path": path,
            "error": err.to_string(),
        });
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let key: String = key.into();
        let problem: String = problem.into();
        let details = serde_json::json!({
            "key": key,
            "value": value,
            "problem": problem,
        });
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn config_id_collision(
        id: impl Into<String>,
        requested_type: impl Into<String>,
        existing_type: impl Into<String>,
    ) -> Self {
        let id: String = id.into();
        let requested: String = requested_type.into();
        let existing: String = existing_type.into();
        let details = serde_json::json!({
            "id": id,
            "requestedType": requested,
            "existingType": existing,
        });
        Self::new(
            ErrorCode::ConfigIdCollision,
            format!("ID '{}' already exists as a {}", id, existing),
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error: String = error.into();
        let details = serde_json::json!({
            "error": error,
            "context": context,
        });
        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let error: String = error.into();
        let details = serde_json::json!({
            "error": error,
            "context": context,
        });
        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_yaml(error: impl Into<String>, context: Option<String>) -> Self {
        let error: String = error.into();
        let details = serde_json::json!({
            "error": error,
            "context": context,
        });
        Self::new(ErrorCode::InternalYamlError, "YAML error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error: String = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_missing_uses_literal_diagnostic() {
        let err = Error::deploy_manifest_missing("requirements.txt");
        assert_eq!(err.message, "ERROR: requirements.txt not found!");
        assert_eq!(err.code.as_str(), "deploy.manifest_missing");
    }

    #[test]
    fn not_found_carries_suggestions() {
        let err = Error::app_not_found("flaskap", vec!["flaskapp".to_string()]);
        assert_eq!(err.code.as_str(), "app.not_found");
        assert_eq!(err.details["similar"][0], "flaskapp");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn display_uses_message() {
        let err = Error::checkout_failed("git clone failed: no route to host");
        assert_eq!(err.to_string(), "git clone failed: no route to host");
    }
}
