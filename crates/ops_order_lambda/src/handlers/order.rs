use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ORDER_STATUS_PLACED: &str = "PLACED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRequest {
    pub product: String,
    pub quantity: u32,
}

/// The flat record the order table stores; field names are the table's
/// attribute names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRecord {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub product: String,
    pub quantity: u32,
    pub status: String,
}

pub trait OrderStore {
    fn put_order(&self, record: &OrderRecord) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Places one order: validate, persist under the supplied id, respond.
///
/// The id is minted by the caller so the handler stays deterministic; a
/// store failure maps to 502 and leaves redelivery to the invoker.
pub fn handle_order_event(
    event: Value,
    order_id: String,
    store: &dyn OrderStore,
) -> ApiGatewayResponse {
    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let request = match serde_json::from_value::<OrderRequest>(payload) {
        Ok(value) => value,
        Err(error) => return validation_error_response(&format!("Malformed order: {error}")),
    };

    let request = match normalize_order(request) {
        Ok(value) => value,
        Err(error) => return validation_error_response(error.message()),
    };

    let record = OrderRecord {
        order_id,
        product: request.product,
        quantity: request.quantity,
        status: ORDER_STATUS_PLACED.to_string(),
    };

    if let Err(error) = store.put_order(&record) {
        return error_response(
            502,
            json!({
                "error": "order_store_failed",
                "message": error,
            }),
        );
    }

    success_response(
        200,
        json!({
            "message": "Order placed successfully",
            "orderId": record.order_id,
        }),
    )
}

pub fn normalize_order(request: OrderRequest) -> Result<OrderRequest, ValidationError> {
    let product = request.product.trim().to_string();
    if product.is_empty() {
        return Err(ValidationError::new("product cannot be empty"));
    }

    if request.quantity == 0 {
        return Err(ValidationError::new("quantity must be a positive integer"));
    }

    Ok(OrderRequest {
        product,
        quantity: request.quantity,
    })
}

fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(
        400,
        json!({
            "error": "validation_error",
            "message": message,
        }),
    )
}

fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}
