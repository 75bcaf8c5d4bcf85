//! Static documentation pages served at `/`

use axum::response::Html;

const LOG_GATEWAY_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>MCP K8s Log Tool - SockShop</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        code { background: #f4f4f4; padding: 2px 4px; }
        .endpoint { background: #e8f4fd; padding: 15px; margin: 10px 0; border-radius: 5px; }
    </style>
</head>
<body>
    <h1>MCP K8s Log Tool - SockShop</h1>
    <p>Fetch Kubernetes pod logs of the SockShop microservices over HTTP</p>

    <div class="endpoint">
        <h3>GET /logs</h3>
        <p>Fetch pod logs from the Kubernetes cluster</p>
        <p><strong>Parameters:</strong></p>
        <ul>
            <li><code>namespace</code> - Kubernetes namespace (required)</li>
            <li><code>pod</code> - Pod name (required)</li>
            <li><code>container</code> - Container name (optional)</li>
            <li><code>lines</code> - Number of lines to fetch (optional, default: 100)</li>
            <li><code>follow</code> - Stream logs (optional, true/false)</li>
        </ul>
        <p><strong>Example:</strong></p>
        <code>/logs?namespace=sock-shop&amp;pod=front-end-xxx&amp;lines=50</code>
    </div>

    <div class="endpoint">
        <h3>GET /health</h3>
        <p>Health check endpoint</p>
    </div>

    <h3>SockShop Services</h3>
    <ul>
        <li>front-end</li>
        <li>orders</li>
        <li>payment</li>
        <li>user</li>
        <li>catalogue</li>
        <li>carts</li>
        <li>shipping</li>
        <li>queue-master</li>
    </ul>
</body>
</html>
"#;

pub async fn log_gateway_page() -> Html<&'static str> {
    Html(LOG_GATEWAY_PAGE)
}

pub fn metrics_gateway_page(version: &str, build_time: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>MCP Prometheus Tool - SockShop</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; background: #f9f9f9; }}
        h1 {{ color: #e6522c; }}
        code {{ background: #f4f4f4; padding: 2px 6px; border-radius: 3px; }}
        .endpoint {{ background: #fff; padding: 15px; margin: 10px 0; border-radius: 5px; border-left: 4px solid #e6522c; }}
        .tag {{ display: inline-block; background: #e6522c; color: white; padding: 2px 8px; border-radius: 3px; font-size: 12px; }}
        .version {{ color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <h1>MCP Prometheus Tool - SockShop</h1>
    <p>Query Prometheus metrics of the SockShop microservices over HTTP</p>
    <p class="version">Version: {version} | Built: {build_time}</p>

    <div class="endpoint">
        <h3><span class="tag">GET</span> /query</h3>
        <p>Execute an instant PromQL query</p>
        <p><strong>Parameters:</strong></p>
        <ul>
            <li><code>query</code> - PromQL expression (required)</li>
            <li><code>time</code> - Evaluation timestamp (optional, RFC3339 or Unix)</li>
        </ul>
        <p><strong>Examples:</strong></p>
        <code>/query?query=up{{job=~"sock-shop/.*"}}</code><br><br>
        <code>/query?query=go_memstats_alloc_bytes{{job=~"sock-shop/.*"}}</code>
    </div>

    <div class="endpoint">
        <h3><span class="tag">GET</span> /health</h3>
        <p>Health check, also probes Prometheus</p>
    </div>

    <h3>Useful PromQL Queries</h3>
    <table border="1" cellpadding="8" cellspacing="0" style="border-collapse: collapse;">
        <tr><th>Query</th><th>Description</th></tr>
        <tr><td><code>up{{job=~"sock-shop/.*"}}</code></td><td>Service availability</td></tr>
        <tr><td><code>go_goroutines{{job=~"sock-shop/.*"}}</code></td><td>Goroutines per service</td></tr>
        <tr><td><code>rate(process_cpu_seconds_total{{job=~"sock-shop/.*"}}[5m])</code></td><td>CPU usage rate</td></tr>
        <tr><td><code>process_open_fds{{job=~"sock-shop/.*"}}</code></td><td>Open file descriptors</td></tr>
    </table>
</body>
</html>
"#
    ))
}
