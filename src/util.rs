use crate::param::STATUS_CODES;

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    /// 错误页。状态码必须在 `STATUS_CODES` 中。
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let title = format!("{}", code);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let description = match note {
            Some(n) => n,
            None => match STATUS_CODES.get(&code) {
                Some(d) => *d,
                None => {
                    panic!("非法的状态码：{}", code);
                }
            },
        };
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code,
            encode_diples(description)
        );
        Self { title, css, body }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <html>
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.title, self.css, self.body
        )
    }
}

/// 千位分隔：`1234567` → `1,234,567`
pub fn beautify_integer(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// 转义尖括号，避免用户输入被当作标签
pub fn encode_diples(value: &str) -> String {
    value.replace('<', "&lt;").replace('>', "&gt;")
}

/// 逐段编码路径，保留 `/` 分隔符
pub fn url_encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `;` 分隔的标签中去掉空标签和以 `_` 开头的内部标签
pub fn visible_tags(tags: &str) -> Vec<String> {
    tags.split(';')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && !t.starts_with('_'))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beautify_integer() {
        assert_eq!(beautify_integer(0), "0");
        assert_eq!(beautify_integer(999), "999");
        assert_eq!(beautify_integer(1000), "1,000");
        assert_eq!(beautify_integer(1234567), "1,234,567");
        assert_eq!(beautify_integer(100000), "100,000");
    }

    #[test]
    fn test_encode_diples() {
        assert_eq!(encode_diples("<script>x</script>"), "&lt;script&gt;x&lt;/script&gt;");
        assert_eq!(encode_diples("a & b"), "a & b");
    }

    #[test]
    fn test_url_encode_path() {
        assert_eq!(url_encode_path("wiki_fr/A/Île de France"), "wiki_fr/A/%C3%8Ele%20de%20France");
        assert_eq!(url_encode_path("/A/a?b#c"), "/A/a%3Fb%23c");
    }

    #[test]
    fn test_visible_tags() {
        assert_eq!(
            visible_tags("wikipedia;_category:wikipedia;;nopic"),
            vec!["wikipedia", "nopic"]
        );
        assert!(visible_tags("").is_empty());
    }

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(404, Some("测试404")).build();
        assert!(html.contains("404"));
        assert!(html.contains("测试404"));
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn test_html_builder_from_status_code_no_note() {
        let html = HtmlBuilder::from_status_code(416, None).build();
        assert!(html.contains("416"));
        assert!(html.contains("Range Not Satisfiable"));
    }

    #[test]
    fn test_html_builder_escapes_note() {
        let html = HtmlBuilder::from_status_code(400, Some("<b>bad</b>")).build();
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;"));
    }

    #[test]
    #[should_panic(expected = "非法的状态码")]
    fn test_html_builder_invalid_status_code() {
        HtmlBuilder::from_status_code(999, None);
    }
}
