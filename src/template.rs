// Template engine collaborator seam

use crate::Error;
use serde_json::Value;

/// Render operation provided by an external templating integration.
///
/// The coercion engine fails with an internal server error when a handler
/// returns a template but no engine was configured.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_name: &str, context: &Value) -> Result<String, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct GreetingEngine;

    impl TemplateEngine for GreetingEngine {
        fn render(&self, template_name: &str, context: &Value) -> Result<String, Error> {
            match template_name {
                "greeting.html" => Ok(format!(
                    "<p>Hello {}</p>",
                    context["name"].as_str().unwrap_or("world")
                )),
                other => Err(Error::Template(format!("unknown template: {other}"))),
            }
        }
    }

    #[test]
    fn test_render() {
        let engine = GreetingEngine;
        let html = engine
            .render("greeting.html", &json!({ "name": "ada" }))
            .unwrap();
        assert_eq!(html, "<p>Hello ada</p>");
    }

    #[test]
    fn test_unknown_template() {
        let engine = GreetingEngine;
        assert!(matches!(
            engine.render("missing.html", &Value::Null),
            Err(Error::Template(_))
        ));
    }
}
