//! MCP tool definitions and request handling
//!
//! This module defines all available tools and handles MCP protocol messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wallet_risk_core::{
    clamp_score, round2, FallbackReason, RiskAssessment, RiskEngine, RiskLevel, WalletSnapshot,
};

use crate::cache::{AssessmentCache, CacheKey};
use crate::error::{validate_score, validate_wallet, Result, RiskMcpError};

const SERVER_NAME: &str = "wallet-risk-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// MCP Protocol Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// =============================================================================
// Risk Tools
// =============================================================================

/// Tool handler wrapping the scoring engine
pub struct RiskTools {
    engine: Arc<RiskEngine>,
    cache: AssessmentCache,
}

impl RiskTools {
    pub fn new(engine: Arc<RiskEngine>, cache: AssessmentCache) -> Self {
        Self { engine, cache }
    }

    /// Get all available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "risk_health".to_string(),
                description: "Check the health of the wallet risk service, including whether AI scoring is enabled".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "risk_assess_wallet".to_string(),
                description: "Score an EVM wallet from 0 (safe) to 100 (risky). Takes a normalized wallet snapshot (balances, transaction history summary, protocol interactions) and returns the overall score, risk level, per-component scores, rule-based/AI/hybrid breakdown and ordered recommendations.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "snapshot": {
                            "type": "object",
                            "description": "Wallet snapshot: { address, balances: { eth_balance, tokens: [{ symbol, balance }] }, history: { total_transactions, successful_transactions, ... }, protocols: [{ protocol_id, category, risk_tier, tvl_usd }] }"
                        },
                        "rule_only": {
                            "type": "boolean",
                            "description": "Skip the AI scorer and return the deterministic rule-based result (default: false)"
                        }
                    },
                    "required": ["snapshot"]
                }),
            },
            Tool {
                name: "risk_classify_score".to_string(),
                description: "Map a 0-100 risk score to its risk level and description.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "score": {
                            "type": "number",
                            "description": "Risk score; values outside 0-100 are clamped"
                        }
                    },
                    "required": ["score"]
                }),
            },
            Tool {
                name: "risk_get_config".to_string(),
                description: "Return the active scoring configuration: weights, rule thresholds, hybrid split and AI settings.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
        ]
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> std::result::Result<Value, String> {
        match name {
            "risk_health" => {
                let config = self.engine.config();
                Ok(json!({
                    "status": "healthy",
                    "version": SERVER_VERSION,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "ai": {
                        "enabled": self.engine.ai_enabled(),
                        "model": config.ai.model
                    },
                    "cache": {
                        "entries": self.cache.entry_count()
                    }
                }))
            }

            "risk_assess_wallet" => {
                let snapshot = args.get("snapshot").ok_or("Missing snapshot parameter")?;
                let rule_only = args["rule_only"].as_bool().unwrap_or(false);
                let assessment = self.assess(snapshot, rule_only).await.map_err(|e| e.to_string())?;
                serde_json::to_value(assessment.as_ref()).map_err(|e| e.to_string())
            }

            "risk_classify_score" => {
                let score = args["score"].as_f64().ok_or("Missing score parameter")?;
                validate_score(score).map_err(|e| e.to_string())?;
                let score = round2(clamp_score(score));
                let level = RiskLevel::classify(score);
                Ok(json!({
                    "score": score,
                    "risk_level": level,
                    "risk_description": level.description()
                }))
            }

            "risk_get_config" => serde_json::to_value(self.engine.config().as_ref()).map_err(|e| e.to_string()),

            _ => Err(format!("Unknown tool: {}", name)),
        }
    }

    async fn assess(&self, raw: &Value, rule_only: bool) -> Result<Arc<RiskAssessment>> {
        let snapshot = WalletSnapshot::deserialize(raw)
            .map_err(|e| RiskMcpError::InvalidParameter(format!("Invalid snapshot: {}", e)))?;
        validate_wallet(&snapshot.address)?;

        let rule_only = rule_only || !self.engine.ai_enabled();
        let key = CacheKey::for_snapshot(&snapshot, rule_only)?;
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(address = %snapshot.address, "Assessment cache hit");
            return Ok(cached);
        }

        let assessment = if rule_only {
            self.engine.assess_rule_based(&snapshot)?
        } else {
            self.engine.assess(&snapshot).await?
        };

        let assessment = Arc::new(assessment);
        // Provider failures stay uncached
        if matches!(
            assessment.scoring_methods.hybrid.fallback,
            Some(FallbackReason::ProviderFailed { .. })
        ) {
            tracing::debug!(address = %snapshot.address, "AI fallback result not cached");
        } else {
            self.cache.insert(key, Arc::clone(&assessment)).await;
        }
        Ok(assessment)
    }
}

// =============================================================================
// MCP Protocol Handlers
// =============================================================================

fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

fn handle_list_tools(tools: &RiskTools) -> Value {
    json!({
        "tools": tools.get_tools()
    })
}

async fn handle_call_tool(tools: &RiskTools, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match tools.execute(name, args).await {
        Ok(result) => {
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                }]
            })
        }
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })
        }
    }
}

/// Handle an incoming MCP request
pub async fn handle_request(tools: &RiskTools, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let result = match request.method.as_str() {
        "initialize" => Some(handle_initialize(&request.params)),
        "initialized" | "notifications/initialized" => None,
        "tools/list" => Some(handle_list_tools(tools)),
        "tools/call" => Some(handle_call_tool(tools, &request.params).await),
        "notifications/cancelled" => None,
        _ => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            });
        }
    };

    result.map(|r| JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result: Some(r),
        error: None,
    })
}
