//! 模板渲染。
//!
//! 结果组装只依赖 `TemplateRenderer`；`MiniJinjaRenderer` 是随程序打包模板的默认实现。

use crate::exception::Exception;
use minijinja::Environment;
use serde_json::Value;

pub const SEARCH_RESULT_TEMPLATE: &str = "search_result.html";
pub const LIBRARY_PAGE_TEMPLATE: &str = "no_js_library_page.html";

pub trait TemplateRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, Exception>;
}

pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// 载入随程序打包的模板
    pub fn with_bundled_templates() -> Result<Self, Exception> {
        let mut renderer = Self::new();
        renderer.add_template(
            SEARCH_RESULT_TEMPLATE,
            include_str!("../templates/search_result.html"),
        )?;
        renderer.add_template(
            LIBRARY_PAGE_TEMPLATE,
            include_str!("../templates/no_js_library_page.html"),
        )?;
        Ok(renderer)
    }

    pub fn add_template(&mut self, name: &'static str, source: &'static str) -> Result<(), Exception> {
        self.env
            .add_template(name, source)
            .map_err(|e| Exception::RenderFailed(e.to_string()))
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, Exception> {
        let tmpl = self
            .env
            .get_template(template)
            .map_err(|e| Exception::RenderFailed(e.to_string()))?;
        tmpl.render(data)
            .map_err(|e| Exception::RenderFailed(e.to_string()))
    }
}
