use std::borrow::Cow;

use chakra_core::control::ControlError;
use chakra_core::gateway::GatewayError;
use chakra_core::memory::MemoryError;
use chakra_core::services::RegistryError;
use chakra_core::store::StoreError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;

pub(crate) fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Maps control-plane failures onto MCP error codes.
pub(crate) fn map_err(err: ControlError) -> ErrorData {
    let code = match &err {
        ControlError::InvalidInput(_)
        | ControlError::Store(StoreError::InvalidInput(_))
        | ControlError::Memory(MemoryError::InvalidInput(_)) => ErrorCode::INVALID_PARAMS,
        ControlError::Gateway(gateway) => gateway_code(gateway),
        ControlError::Store(_) | ControlError::Memory(_) => ErrorCode::INTERNAL_ERROR,
    };
    mcp_err(code, err.to_string())
}

const fn gateway_code(err: &GatewayError) -> ErrorCode {
    match err {
        GatewayError::Status { status: 404, .. } => ErrorCode::RESOURCE_NOT_FOUND,
        GatewayError::Status { status: 400 | 409 | 422, .. } => ErrorCode::INVALID_PARAMS,
        _ => ErrorCode::INTERNAL_ERROR,
    }
}

pub(crate) fn map_registry_err(err: RegistryError) -> ErrorData {
    let code = match err {
        RegistryError::InvalidNamespace(_) => ErrorCode::INVALID_PARAMS,
        RegistryError::CapacityReached { .. } | RegistryError::BuildFailed(_) => {
            ErrorCode::INTERNAL_ERROR
        }
    };
    mcp_err(code, err.to_string())
}

/// Trims an optional parameter, treating blank strings as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
