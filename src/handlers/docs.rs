use axum::{response::Html, Json};
use serde_json::{json, Value};

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Investing API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "/apispec.json", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

pub async fn apidocs() -> Html<&'static str> {
    Html(SWAGGER_UI)
}

pub async fn apispec() -> Json<Value> {
    Json(openapi_document())
}

fn path_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": {"type": "string"},
        "description": description,
    })
}

fn query_param(name: &str, kind: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "schema": {"type": kind},
        "description": description,
    })
}

fn ok(description: &str) -> Value {
    json!({"description": description})
}

fn trigger(summary: &str) -> Value {
    json!({
        "tags": ["ingestion"],
        "summary": summary,
        "security": [{"bearerAuth": []}],
        "responses": {
            "200": ok("Job finished; the body carries a report"),
            "401": ok("Missing or wrong token"),
            "500": ok("Job failed"),
        },
    })
}

pub fn openapi_document() -> Value {
    let code = path_param("code", "Stock code, e.g. PETR4");

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Investing API",
            "description": "Stock listing, news and price history collected from InfoMoney",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"},
            },
        },
        "paths": {
            "/health": {
                "get": {"summary": "Health check", "responses": {"200": ok("Service is up")}},
            },
            "/api/stocks": {
                "get": {
                    "tags": ["stocks"],
                    "summary": "List stocks, optionally filtered by name",
                    "parameters": [query_param("name", "string", "Case-insensitive name fragment")],
                    "responses": {"200": ok("Stocks")},
                },
                "post": {
                    "tags": ["stocks"],
                    "summary": "Add stocks",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {"stocks": {"type": "array", "items": {
                                "type": "object",
                                "properties": {
                                    "code": {"type": "string"},
                                    "name": {"type": "string"},
                                    "company": {"type": "string"},
                                    "url": {"type": "string"},
                                },
                            }}},
                        }}},
                    },
                    "responses": {"200": ok("Created stocks"), "400": ok("No stocks data provided")},
                },
            },
            "/api/stocks/fetch": {"get": trigger("Fetch the stock listing from InfoMoney")},
            "/api/stocks/{code}": {
                "get": {
                    "tags": ["stocks"],
                    "summary": "Get a stock by code",
                    "parameters": [code.clone()],
                    "responses": {"200": ok("Stock"), "404": ok("Unknown stock")},
                },
                "delete": {
                    "tags": ["stocks"],
                    "summary": "Soft delete a stock",
                    "parameters": [code.clone()],
                    "responses": {"200": ok("Deleted"), "404": ok("Unknown stock")},
                },
            },
            "/api/news": {
                "get": {
                    "tags": ["news"],
                    "summary": "List news, optionally for one stock",
                    "parameters": [query_param("stock_code", "string", "Stock code")],
                    "responses": {"200": ok("News"), "404": ok("Unknown stock")},
                },
            },
            "/api/news/fetch": {"post": trigger("Collect article links from every stock hub")},
            "/api/news/save-stock-urls": {"get": trigger("Find the news hub of every stock")},
            "/api/news/update-content": {"post": trigger("Fill title, content and date of pending articles")},
            "/api/news/{id}": {
                "get": {
                    "tags": ["news"],
                    "summary": "Get a news article",
                    "parameters": [path_param("id", "News UUID")],
                    "responses": {"200": ok("News"), "404": ok("Unknown news")},
                },
                "delete": {
                    "tags": ["news"],
                    "summary": "Soft delete a news article",
                    "parameters": [path_param("id", "News UUID")],
                    "responses": {"200": ok("Deleted"), "404": ok("Unknown news")},
                },
            },
            "/api/historical-data/fetch": {
                "get": {
                    "tags": ["historical-data"],
                    "summary": "Fetch price history for every stock with a news hub",
                    "security": [{"bearerAuth": []}],
                    "parameters": [query_param("pages", "integer", "Pages of 50 days each, default 1")],
                    "responses": {"200": ok("Report"), "401": ok("Missing or wrong token"), "404": ok("No stocks found")},
                },
            },
            "/api/historical-data/{code}": {
                "get": {
                    "tags": ["historical-data"],
                    "summary": "Price history, optionally within a date range",
                    "parameters": [
                        code.clone(),
                        query_param("start_date", "string", "YYYY-MM-DD"),
                        query_param("end_date", "string", "YYYY-MM-DD, inclusive"),
                    ],
                    "responses": {"200": ok("History"), "400": ok("Invalid date"), "404": ok("Unknown stock")},
                },
            },
            "/api/historical-data/{code}/latest": {
                "get": {
                    "tags": ["historical-data"],
                    "summary": "Latest trading day",
                    "parameters": [code.clone()],
                    "responses": {"200": ok("Latest entry"), "404": ok("Unknown stock or no data")},
                },
            },
            "/api/historical-data/{code}/variation": {
                "get": {
                    "tags": ["historical-data"],
                    "summary": "Variation over the last N days",
                    "parameters": [code.clone(), query_param("days", "integer", "Window in days, default 30")],
                    "responses": {"200": ok("Variation"), "404": ok("Unknown stock or no data")},
                },
            },
            "/api/historical-data/{code}/date-range": {
                "get": {
                    "tags": ["historical-data"],
                    "summary": "Oldest and newest stored trading days",
                    "parameters": [code],
                    "responses": {"200": ok("Date range"), "404": ok("Unknown stock")},
                },
            },
        },
    })
}
