use serde::{Deserialize, Serialize};

use portico_core::BEARER_PREFIX;

/// Built once at startup and rendered into the initializer script the viewer
/// bootstraps from. Fields mirror the Swagger UI constructor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub schema_url: String,
    pub mount_point: String,
    pub deep_linking: bool,
    pub presets: Vec<String>,
    pub plugins: Vec<String>,
    pub layout: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            schema_url: "/swagger/doc.json".to_string(),
            mount_point: "#swagger-ui".to_string(),
            deep_linking: true,
            presets: vec![
                "SwaggerUIBundle.presets.apis".to_string(),
                "SwaggerUIStandalonePreset".to_string(),
            ],
            plugins: vec!["SwaggerUIBundle.plugins.DownloadUrl".to_string()],
            layout: "StandaloneLayout".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Renders the viewer bootstrap script. The request interceptor enforces
    /// the bearer convention on every call the viewer issues, and the built
    /// instance lands on `window.ui` for console use.
    pub fn initializer_script(&self) -> String {
        format!(
            r#"window.onload = function () {{
    const ui = SwaggerUIBundle({{
        url: "{url}",
        dom_id: "{dom_id}",
        deepLinking: {deep_linking},
        presets: [
            {presets}
        ],
        plugins: [
            {plugins}
        ],
        layout: "{layout}",
        requestInterceptor: (req) => {{
            if (req.headers.Authorization && !req.headers.Authorization.startsWith("{prefix}")) {{
                req.headers.Authorization = "{prefix}" + req.headers.Authorization;
            }}
            return req;
        }}
    }});
    window.ui = ui;
}};
"#,
            url = self.schema_url,
            dom_id = self.mount_point,
            deep_linking = self.deep_linking,
            presets = self.presets.join(",\n            "),
            plugins = self.plugins.join(",\n            "),
            layout = self.layout,
            prefix = BEARER_PREFIX,
        )
    }
}
