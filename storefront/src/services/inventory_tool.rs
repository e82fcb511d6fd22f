// storefront/src/services/inventory_tool.rs

//! JSON-RPC 2.0 tool endpoint for inventory management agents.
//!
//! `tools/list` describes the tools, `tools/call` runs one. Protocol problems
//! are JSON-RPC errors; a tool that runs but cannot do its job answers a
//! normal result with `isError: true`.

use crate::errors::AppError;
use crate::models::Product;
use crate::store::{Backend, CatalogStore, StockChange};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
  Number(i64),
  String(String),
}

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
  pub jsonrpc: String,
  pub id: Option<RequestId>,
  pub method: String,
  #[serde(default)]
  pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
  pub code: i64,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
  pub jsonrpc: &'static str,
  pub id: Option<RequestId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<RpcError>,
}

impl RpcResponse {
  fn result(id: Option<RequestId>, result: Value) -> Self {
    Self {
      jsonrpc: "2.0",
      id,
      result: Some(result),
      error: None,
    }
  }

  pub fn error(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
    Self {
      jsonrpc: "2.0",
      id,
      result: None,
      error: Some(RpcError {
        code,
        message: message.into(),
      }),
    }
  }
}

#[derive(Debug, Error)]
enum ToolError {
  #[error("Unknown method '{0}'")]
  UnknownMethod(String),
  #[error("Invalid params: {0}")]
  InvalidParams(String),
  /// The tool ran and reports a failure to the caller.
  #[error("{0}")]
  Failed(String),
  #[error(transparent)]
  App(#[from] AppError),
}

#[derive(Debug, Deserialize)]
struct CallParams {
  name: String,
  #[serde(default)]
  arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ProductArgs {
  product_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SetStockArgs {
  product_id: Uuid,
  quantity: i32,
}

#[derive(Debug, Deserialize)]
struct AdjustStockArgs {
  product_id: Uuid,
  delta: i32,
}

#[derive(Debug, Default, Deserialize)]
struct LowStockArgs {
  threshold: Option<i32>,
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
  let arguments = if arguments.is_null() { json!({}) } else { arguments };
  serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn stock_json(product: &Product) -> Value {
  json!({
    "productId": product.id,
    "slug": product.slug,
    "name": product.name,
    "stockQuantity": product.stock_quantity,
    "isActive": product.is_active,
  })
}

pub struct InventoryTool {
  backend: Arc<dyn Backend>,
  default_low_stock_threshold: i32,
}

impl InventoryTool {
  pub fn new(backend: Arc<dyn Backend>, default_low_stock_threshold: i32) -> Self {
    Self {
      backend,
      default_low_stock_threshold,
    }
  }

  /// Handles one raw JSON-RPC message.
  pub async fn handle_value(&self, raw: Value) -> RpcResponse {
    let id = raw
      .get("id")
      .cloned()
      .and_then(|v| serde_json::from_value::<RequestId>(v).ok());
    match serde_json::from_value::<RpcRequest>(raw) {
      Ok(request) if request.jsonrpc == "2.0" => self.handle(request).await,
      Ok(_) => RpcResponse::error(id, INVALID_REQUEST, "jsonrpc must be \"2.0\""),
      Err(e) => RpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {}", e)),
    }
  }

  #[instrument(name = "InventoryTool::handle", skip_all, fields(method = %request.method))]
  pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let outcome = match request.method.as_str() {
      "tools/list" => Ok(json!({ "tools": Self::descriptors() })),
      "tools/call" => self.call(request.params.unwrap_or(Value::Null)).await,
      other => Err(ToolError::UnknownMethod(other.to_string())),
    };

    match outcome {
      Ok(result) => RpcResponse::result(id, result),
      Err(ToolError::UnknownMethod(method)) => {
        RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method '{}' not found", method))
      }
      Err(ToolError::InvalidParams(msg)) => RpcResponse::error(id, INVALID_PARAMS, msg),
      Err(ToolError::Failed(msg)) => RpcResponse::result(id, tool_failure(&msg)),
      Err(ToolError::App(AppError::Validation(msg))) | Err(ToolError::App(AppError::NotFound(msg))) => {
        RpcResponse::result(id, tool_failure(&msg))
      }
      Err(ToolError::App(e)) => {
        warn!(error = %e, "Inventory tool failed internally.");
        RpcResponse::error(id, INTERNAL_ERROR, "Internal error")
      }
    }
  }

  async fn call(&self, params: Value) -> Result<Value, ToolError> {
    let CallParams { name, arguments } = parse_args(params)?;
    info!(tool = %name, "Inventory tool call.");
    let payload = match name.as_str() {
      "list_products" => {
        let products = self.backend.list_products(true).await?;
        json!({ "products": products.iter().map(stock_json).collect::<Vec<_>>() })
      }
      "get_product_stock" => {
        let args: ProductArgs = parse_args(arguments)?;
        let product = self
          .backend
          .get_product(args.product_id)
          .await?
          .ok_or_else(|| ToolError::Failed(format!("Product {} not found", args.product_id)))?;
        stock_json(&product)
      }
      "set_product_stock" => {
        let args: SetStockArgs = parse_args(arguments)?;
        if args.quantity < 0 {
          return Err(ToolError::InvalidParams("quantity must be >= 0".to_string()));
        }
        let product = self
          .backend
          .set_stock(args.product_id, args.quantity)
          .await?
          .ok_or_else(|| ToolError::Failed(format!("Product {} not found", args.product_id)))?;
        stock_json(&product)
      }
      "adjust_product_stock" => {
        let args: AdjustStockArgs = parse_args(arguments)?;
        match self.backend.adjust_stock(args.product_id, args.delta).await? {
          StockChange::Applied(product) => stock_json(&product),
          StockChange::Insufficient { available } => {
            return Err(ToolError::Failed(format!(
              "Adjustment of {} would make stock negative (available: {})",
              args.delta, available
            )))
          }
          StockChange::NotFound => {
            return Err(ToolError::Failed(format!("Product {} not found", args.product_id)))
          }
        }
      }
      "list_low_stock" => {
        let args: LowStockArgs = parse_args(arguments)?;
        let threshold = args.threshold.unwrap_or(self.default_low_stock_threshold);
        let products = self.backend.low_stock(threshold).await?;
        json!({
          "threshold": threshold,
          "products": products.iter().map(stock_json).collect::<Vec<_>>(),
        })
      }
      other => return Err(ToolError::InvalidParams(format!("Unknown tool '{}'", other))),
    };
    Ok(tool_success(payload))
  }

  pub fn descriptors() -> Value {
    json!([
      {
        "name": "list_products",
        "description": "List all products with their stock levels, including inactive ones.",
        "inputSchema": { "type": "object", "properties": {} }
      },
      {
        "name": "get_product_stock",
        "description": "Get the stock level of one product.",
        "inputSchema": {
          "type": "object",
          "properties": { "product_id": { "type": "string", "format": "uuid" } },
          "required": ["product_id"]
        }
      },
      {
        "name": "set_product_stock",
        "description": "Set the stock level of a product to an absolute quantity.",
        "inputSchema": {
          "type": "object",
          "properties": {
            "product_id": { "type": "string", "format": "uuid" },
            "quantity": { "type": "integer", "minimum": 0 }
          },
          "required": ["product_id", "quantity"]
        }
      },
      {
        "name": "adjust_product_stock",
        "description": "Add to or remove from a product's stock. Stock never goes below zero.",
        "inputSchema": {
          "type": "object",
          "properties": {
            "product_id": { "type": "string", "format": "uuid" },
            "delta": { "type": "integer" }
          },
          "required": ["product_id", "delta"]
        }
      },
      {
        "name": "list_low_stock",
        "description": "List active products at or below a stock threshold.",
        "inputSchema": {
          "type": "object",
          "properties": { "threshold": { "type": "integer", "minimum": 0 } }
        }
      }
    ])
  }
}

fn tool_success(payload: Value) -> Value {
  json!({
    "content": [{ "type": "text", "text": payload.to_string() }],
    "structuredContent": payload,
    "isError": false,
  })
}

fn tool_failure(message: &str) -> Value {
  json!({
    "content": [{ "type": "text", "text": message }],
    "isError": true,
  })
}

pub fn parse_error() -> RpcResponse {
  RpcResponse::error(None, PARSE_ERROR, "Parse error")
}
