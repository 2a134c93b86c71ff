//! Deployment unit synthesis.
//!
//! Wraps generated sources in the fixed Vite + React scaffold so the static
//! host can build them with `npm install && npm run build`. Pure: no I/O.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::warn;

use crate::extract::GeneratedCode;
use crate::types::Project;

pub const MANIFEST_PATH: &str = "package.json";
pub const BUNDLER_CONFIG_PATH: &str = "vite.config.ts";
pub const HTML_SHELL_PATH: &str = "index.html";
pub const BOOTSTRAP_PATH: &str = "src/main.tsx";
pub const ENTRY_PATH: &str = "src/App.tsx";
pub const COMPONENT_DIR: &str = "src/components";

/// Scaffold files every unit carries.
pub const SCAFFOLD_PATHS: [&str; 5] = [
    MANIFEST_PATH,
    BUNDLER_CONFIG_PATH,
    HTML_SHELL_PATH,
    BOOTSTRAP_PATH,
    ENTRY_PATH,
];

/// Complete deployable file tree, keyed by repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentUnit {
    files: BTreeMap<String, String>,
}

impl DeploymentUnit {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

/// Builds the deployment unit for a project.
pub fn synthesize(code: &GeneratedCode, project: &Project) -> DeploymentUnit {
    let mut files = BTreeMap::new();

    files.insert(MANIFEST_PATH.to_string(), package_json(project.id));
    files.insert(BUNDLER_CONFIG_PATH.to_string(), VITE_CONFIG.to_string());
    files.insert(HTML_SHELL_PATH.to_string(), index_html(&project.name));
    files.insert(BOOTSTRAP_PATH.to_string(), MAIN_TSX.to_string());
    files.insert(ENTRY_PATH.to_string(), code.entry.clone());

    for (name, source) in &code.components {
        match component_stem(name) {
            Some(stem) => {
                // Components are visited in name order, so the first claimant keeps the path.
                let path = format!("{COMPONENT_DIR}/{stem}.tsx");
                if files.contains_key(&path) {
                    warn!(
                        project_id = project.id,
                        component = %name,
                        path = %path,
                        "dropping component whose file name is already taken"
                    );
                } else {
                    files.insert(path, source.clone());
                }
            }
            None => warn!(
                project_id = project.id,
                component = %name,
                "dropping component with unusable name"
            ),
        }
    }

    DeploymentUnit { files }
}

/// Reduces a component name to a safe file stem.
pub fn component_stem(name: &str) -> Option<String> {
    let base = [".tsx", ".jsx", ".ts", ".js"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name);
    let stem: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    (!stem.is_empty()).then_some(stem)
}

fn package_json(project_id: u64) -> String {
    let manifest = json!({
        "name": format!("app-{project_id}"),
        "private": true,
        "version": "1.0.0",
        "type": "module",
        "scripts": {
            "dev": "vite",
            "build": "vite build",
            "preview": "vite preview"
        },
        "dependencies": {
            "react": "^18.2.0",
            "react-dom": "^18.2.0"
        },
        "devDependencies": {
            "@types/react": "^18.2.0",
            "@types/react-dom": "^18.2.0",
            "@vitejs/plugin-react": "^4.2.0",
            "vite": "^5.0.0"
        }
    });
    let mut out = serde_json::to_string_pretty(&manifest).unwrap_or_default();
    out.push('\n');
    out
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn index_html(title: &str) -> String {
    INDEX_HTML.replace("__TITLE__", &html_escape(title))
}

const VITE_CONFIG: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({
  plugins: [react()],
})
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>__TITLE__</title>
    <style>* { margin: 0; padding: 0; box-sizing: border-box; }</style>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
"#;

const MAIN_TSX: &str = r#"import React from 'react'
import ReactDOM from 'react-dom/client'
import App from './App'

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>,
)
"#;
