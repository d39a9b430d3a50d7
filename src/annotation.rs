//! Doc-comment annotation grammar.
//!
//! Every doc line of an operation is fed to [`AnnotationParser::apply_line`]. The first token
//! selects the attribute, the rest of the line is its payload:
//!
//! ```text
//! /// List 获取书籍列表
//! /// @catalog 测试文档/书籍
//! /// @url GET {{BASEURL}}/api/v1/book/list
//! /// @header Authorization string true "bearer {{TOKEN}}" "用户登录凭证"
//! /// @param page int true "1" "第几页"
//! /// @resp ListRsp{}
//! ```
//!
//! A first token equal to the operation's own name sets the title. Payloads ending in `{}` name
//! a type that is expanded through the [`StructWalker`].

use crate::api_doc::{
    ApiDoc, ApiResponse, ApiStatus, ParamMode, RequestParam, ResponseParam, METHOD_GET,
};
use crate::serializer::format_json;
use crate::source::UnitId;
use crate::struct_walker::{FieldTree, StructWalker};
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

// [name] [type] [required] ["value"] ["remark"]
static RE_REQUEST_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\S+)\s+(\w+)\s+(\w+)\s+"([^"]*)"\s+"([^"]*)""#).unwrap()
});

// [name] [type] ["remark"]
static RE_RESPONSE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\S+)\s+(\w+)\s+"([^"]*)""#).unwrap());

const REQUEST_PARAM_FORMAT: &str = "expected [name] [type] [required] [\"value\"] [\"remark\"]";
const RESPONSE_PARAM_FORMAT: &str = "expected [name] [type] [\"remark\"]";

/// Attribute keyword of an annotation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Title,
    Catalog,
    Description,
    Remark,
    Url,
    ApiStatus,
    Header,
    PathVar,
    Query,
    ParamMode,
    Param,
    Response,
    ResponseFail,

    Unknown(String),
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "@title" => Self::Title,
            "@catalog" => Self::Catalog,
            "@desc" | "@description" => Self::Description,
            "@remark" => Self::Remark,
            "@url" => Self::Url,
            "@api_status" => Self::ApiStatus,
            "@header" => Self::Header,
            "@path_var" => Self::PathVar,
            "@query" => Self::Query,
            "@param_mode" => Self::ParamMode,
            "@param" => Self::Param,
            "@resp" | "@response" => Self::Response,
            "@resp_fail" | "@response_fail" => Self::ResponseFail,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A line that uses a known attribute but breaks its grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationError {
    pub line: String,
    pub message: String,
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\"", self.message, self.line)
    }
}

impl std::error::Error for AnnotationError {}

/// Applies annotation lines to one [`ApiDoc`].
pub struct AnnotationParser<'w> {
    doc: ApiDoc,
    types: Option<(&'w mut StructWalker, UnitId)>,
}

impl<'w> AnnotationParser<'w> {
    pub fn new(doc: ApiDoc) -> Self {
        Self { doc, types: None }
    }

    /// Enables `Type{}` payloads, resolved from `unit`.
    pub fn with_types(mut self, walker: &'w mut StructWalker, unit: UnitId) -> Self {
        self.types = Some((walker, unit));
        self
    }

    pub fn doc(&self) -> &ApiDoc {
        &self.doc
    }

    pub fn into_doc(self) -> ApiDoc {
        self.doc
    }

    /// Applies one raw doc-comment line. `operation` is empty for file-level comments.
    ///
    /// # Errors
    ///
    /// Returns an error when a known attribute has a malformed payload. Unknown attributes and
    /// plain prose are ignored.
    pub fn apply_line(&mut self, operation: &str, comment: &str) -> Result<(), AnnotationError> {
        let line = comment
            .trim()
            .trim_start_matches(|c| c == '/' || c == '*')
            .trim();
        let Some(token) = line.split_whitespace().next() else {
            return Ok(());
        };
        let remainder = line[token.len()..].trim();

        if !operation.is_empty() && same_name(token, operation) {
            self.doc.title = if remainder.is_empty() {
                token.to_string()
            } else {
                remainder.to_string()
            };
            return Ok(());
        }

        match Attribute::from(token) {
            Attribute::Title => self.doc.title = remainder.to_string(),
            Attribute::Catalog => self.apply_catalog(remainder),
            Attribute::Description => append_line(&mut self.doc.description, remainder),
            Attribute::Remark => append_line(&mut self.doc.remark, remainder),
            Attribute::Url => self.apply_url(remainder)?,
            Attribute::ApiStatus => self.doc.request.api_status = ApiStatus::from_code(remainder),
            Attribute::Header => {
                let caps = self.request_captures(remainder, "cannot parse @header")?;
                self.doc
                    .request
                    .headers
                    .push(RequestParam::header(&caps[0], &caps[1], &caps[2], &caps[3], &caps[4]));
            }
            Attribute::PathVar => {
                let caps = self.request_captures(remainder, "cannot parse @path_var")?;
                self.doc
                    .request
                    .path_variables
                    .push(RequestParam::new(&caps[0], &caps[1], &caps[2], &caps[3], &caps[4]));
            }
            Attribute::Query => {
                let (params, _) = self.request_params(remainder, "cannot parse @query")?;
                self.doc.request.query.extend(params);
            }
            Attribute::ParamMode => self.apply_param_mode(remainder)?,
            Attribute::Param => self.apply_param(remainder)?,
            Attribute::Response => {
                let (params, example) = self.response_params(remainder, "cannot parse @response")?;
                merge_response(&mut self.doc.response, params, example);
            }
            Attribute::ResponseFail => {
                let (params, example) =
                    self.response_params(remainder, "cannot parse @response_fail")?;
                merge_response(&mut self.doc.response_fail, params, example);
            }
            Attribute::Unknown(_) => {}
        }

        Ok(())
    }

    fn apply_catalog(&mut self, segment: &str) {
        let mut catalog = std::mem::take(&mut self.doc.catalog);
        if !segment.starts_with('/') {
            catalog.push('/');
        }
        catalog.push_str(segment);
        self.doc.catalog = catalog.trim_matches('/').to_string();
    }

    fn apply_url(&mut self, payload: &str) -> Result<(), AnnotationError> {
        let fields: Vec<&str> = payload.split_whitespace().collect();
        let [method, url] = fields.as_slice() else {
            return Err(error(payload, "@url expects [method] [url]"));
        };
        let request = &mut self.doc.request;
        request.method = method.to_lowercase();
        request.url = url.to_string();
        request.param_mode = ParamMode::for_method(&request.method);
        Ok(())
    }

    fn apply_param_mode(&mut self, payload: &str) -> Result<(), AnnotationError> {
        let Some(mode) = ParamMode::parse(payload) else {
            return Err(error(payload, "unsupported @param_mode"));
        };
        if mode != ParamMode::UrlEncoded && self.doc.request.method == METHOD_GET {
            return Err(error(payload, "GET requests only support urlencoded params"));
        }
        self.doc.request.param_mode = mode;
        Ok(())
    }

    fn apply_param(&mut self, payload: &str) -> Result<(), AnnotationError> {
        let (params, example) = self.request_params(payload, "cannot parse @param")?;
        let request = &mut self.doc.request;
        if request.method == METHOD_GET {
            request.query.extend(params);
        } else {
            request.params.extend(params);
        }
        if request.param_mode == ParamMode::Json {
            if let Some(example) = example {
                request.param_json = format_json(&example);
            }
        }
        Ok(())
    }

    fn request_captures(&self, payload: &str, message: &str) -> Result<Vec<String>, AnnotationError> {
        let caps = RE_REQUEST_PARAM
            .captures(payload)
            .ok_or_else(|| error(payload, &format!("{}, {}", message, REQUEST_PARAM_FORMAT)))?;
        Ok((1..=5)
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect())
    }

    /// Parameters of a 5-field line, or the fields of a `Type{}` reference with its example.
    fn request_params(
        &mut self,
        payload: &str,
        message: &str,
    ) -> Result<(Vec<RequestParam>, Option<Value>), AnnotationError> {
        if let Some(type_name) = type_reference(payload) {
            let Some(tree) = self.expand(type_name) else {
                return Ok((Vec::new(), None));
            };
            let params = tree
                .all_fields()
                .into_iter()
                .map(|field| RequestParam {
                    name: field.name,
                    kind: field.coarse,
                    required: field.required,
                    value: field.value,
                    remark: field.remark,
                })
                .collect();
            return Ok((params, Some(tree.to_json())));
        }

        let caps = self.request_captures(payload, message)?;
        let param = RequestParam::new(&caps[0], &caps[1], &caps[2], &caps[3], &caps[4]);
        Ok((vec![param], None))
    }

    fn response_params(
        &mut self,
        payload: &str,
        message: &str,
    ) -> Result<(Vec<ResponseParam>, Option<Value>), AnnotationError> {
        if let Some(type_name) = type_reference(payload) {
            let Some(tree) = self.expand(type_name) else {
                return Ok((Vec::new(), None));
            };
            let params = tree
                .all_fields()
                .into_iter()
                .map(|field| ResponseParam {
                    name: field.name,
                    kind: field.coarse,
                    remark: field.remark,
                })
                .collect();
            return Ok((params, Some(tree.to_json())));
        }

        let caps = RE_RESPONSE_PARAM
            .captures(payload)
            .ok_or_else(|| error(payload, &format!("{}, {}", message, RESPONSE_PARAM_FORMAT)))?;
        let param = ResponseParam::new(&caps[1], &caps[2], &caps[3]);
        Ok((vec![param], None))
    }

    fn expand(&mut self, type_name: &str) -> Option<FieldTree> {
        if type_name.is_empty() {
            return None;
        }
        let (walker, unit) = self.types.as_mut()?;
        let tree = walker.expand_named(type_name, *unit);
        if tree.is_none() {
            debug!("Type {} has no fields to document", type_name);
        }
        tree
    }
}

/// `Type{}` payloads name a type to expand.
fn type_reference(payload: &str) -> Option<&str> {
    if payload.ends_with("{}") {
        Some(payload.trim_end_matches(|c| c == '{' || c == '}').trim())
    } else {
        None
    }
}

fn merge_response(response: &mut ApiResponse, params: Vec<ResponseParam>, example: Option<Value>) {
    response.params.extend(params);
    let Some(example) = example else {
        return;
    };
    if response.example.is_empty() {
        response.example = format_json(&example);
    } else if response.example.starts_with('{') {
        // Wrap the type's example into the `data` key of the existing envelope
        if let Ok(Value::Object(mut envelope)) = serde_json::from_str::<Value>(&response.example) {
            envelope.insert("data".to_string(), example);
            response.example = format_json(&Value::Object(envelope));
        }
    }
}

fn append_line(text: &mut String, line: &str) {
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(line);
}

/// Case-insensitive comparison that also ignores underscores, so that `ListBooks` names the
/// function `list_books`.
fn same_name(token: &str, operation: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect()
    };
    normalize(token) == normalize(operation)
}

fn error(line: &str, message: &str) -> AnnotationError {
    AnnotationError {
        line: line.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_doc::CoarseType;
    use crate::catalog::tests::{catalog_with, scanned, MemoryLoader};
    use crate::type_resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn apply(operation: &str, lines: &[&str]) -> ApiDoc {
        let mut parser = AnnotationParser::new(ApiDoc::new());
        for line in lines {
            parser.apply_line(operation, line).unwrap();
        }
        parser.into_doc()
    }

    fn walker_for(code: &str) -> (StructWalker, UnitId) {
        let mut catalog = catalog_with(MemoryLoader::default());
        let unit = scanned(&mut catalog, "crate::api", code);
        (StructWalker::new(TypeResolver::new(catalog)), unit)
    }

    #[test]
    fn test_title_from_operation_name() {
        let doc = apply("list_books", &[" ListBooks 获取书籍列表"]);
        assert_eq!(doc.title, "获取书籍列表");

        let doc = apply("list_books", &[" ListBooks"]);
        assert_eq!(doc.title, "ListBooks");

        let doc = apply("delete", &[" @title 删除书籍", " 删除一本书"]);
        assert_eq!(doc.title, "删除书籍");

        // General comments never take an implicit title
        let doc = apply("", &[" Handler 书籍管理"]);
        assert_eq!(doc.title, "");
    }

    #[test]
    fn test_catalog_segments() {
        let doc = apply("", &["@catalog a", "@catalog b"]);
        assert_eq!(doc.catalog, "a/b");

        let doc = apply("", &["@catalog /测试文档/书籍/", "@catalog /管理"]);
        assert_eq!(doc.catalog, "测试文档/书籍/管理");
    }

    #[test]
    fn test_description_and_remark_accumulate() {
        let doc = apply("", &["@desc 第一行", "@description 第二行", "@remark 注意"]);
        assert_eq!(doc.description, "第一行\n第二行");
        assert_eq!(doc.remark, "注意");
    }

    #[test]
    fn test_url_sets_method_and_mode() {
        let doc = apply("", &["@url POST {{BASEURL}}/api/v1/book/edit"]);
        assert_eq!(doc.request.method, "post");
        assert_eq!(doc.request.url, "{{BASEURL}}/api/v1/book/edit");
        assert_eq!(doc.request.param_mode, ParamMode::Json);

        let doc = apply("", &["@url DELETE /del/:id"]);
        assert_eq!(doc.request.method, "delete");
        assert_eq!(doc.request.param_mode, ParamMode::UrlEncoded);

        let mut parser = AnnotationParser::new(ApiDoc::new());
        let err = parser.apply_line("", "@url GET").unwrap_err();
        assert_eq!(err.line, "GET");
        assert!(parser.apply_line("", "@url GET /a extra").is_err());
    }

    #[test]
    fn test_api_status() {
        let doc = apply("", &["@api_status 2"]);
        assert_eq!(doc.request.api_status, ApiStatus::Testing);
        let doc = apply("", &["@api_status 7"]);
        assert_eq!(doc.request.api_status, ApiStatus::None);
    }

    #[test]
    fn test_five_field_params() {
        let doc = apply(
            "",
            &[
                r#"@header Authorization string true "bearer {{TOKEN}}" "用户登录凭证""#,
                r#"@header X-Count int 1 "" "数量""#,
                r#"@path_var :id int 必填 "" "书籍 id""#,
                r#"@query page int true "1" "第几页""#,
            ],
        );

        assert_eq!(
            doc.request.headers,
            vec![
                RequestParam {
                    name: "Authorization".to_string(),
                    kind: CoarseType::String,
                    required: true,
                    value: "bearer {{TOKEN}}".to_string(),
                    remark: "用户登录凭证".to_string(),
                },
                RequestParam {
                    name: "X-Count".to_string(),
                    kind: CoarseType::Number,
                    required: true,
                    value: String::new(),
                    remark: "数量".to_string(),
                },
            ]
        );
        assert_eq!(doc.request.path_variables[0].name, ":id");
        assert!(doc.request.path_variables[0].required);
        assert_eq!(doc.request.query[0].kind, CoarseType::Int);
        assert_eq!(doc.request.query[0].value, "1");

        let mut parser = AnnotationParser::new(ApiDoc::new());
        assert!(parser.apply_line("", "@header token string").is_err());
        assert!(parser.apply_line("", "@path_var id int true").is_err());
    }

    #[test]
    fn test_param_goes_to_query_for_get() {
        let doc = apply(
            "",
            &[
                "@url GET /books",
                r#"@param page int true "" "第几页""#,
            ],
        );
        assert_eq!(doc.request.query.len(), 1);
        assert!(doc.request.params.is_empty());

        let doc = apply(
            "",
            &["@url PUT /books", r#"@param name string false "" "书名""#],
        );
        assert_eq!(doc.request.params.len(), 1);
        assert!(!doc.request.params[0].required);
    }

    #[test]
    fn test_param_mode() {
        let doc = apply("", &["@url PUT /x", "@param_mode form-data"]);
        assert_eq!(doc.request.param_mode, ParamMode::FormData);

        let mut parser = AnnotationParser::new(ApiDoc::new());
        parser.apply_line("", "@url GET /x").unwrap();
        assert!(parser.apply_line("", "@param_mode json").is_err());
        assert!(parser.apply_line("", "@param_mode xml").is_err());
        parser.apply_line("", "@param_mode urlencoded").unwrap();
    }

    #[test]
    fn test_response_type_reference() {
        let (mut walker, unit) = walker_for(
            r#"
                pub struct Summary {
                    pub count: i32,
                    pub name: String,
                }
            "#,
        );
        let mut parser = AnnotationParser::new(ApiDoc::new()).with_types(&mut walker, unit);
        parser.apply_line("", "@resp Summary{}").unwrap();
        let doc = parser.into_doc();

        assert_eq!(
            doc.response.params,
            vec![
                ResponseParam::new("count", "int", ""),
                ResponseParam::new("name", "string", ""),
            ]
        );
        let example: Value = serde_json::from_str(&doc.response.example).unwrap();
        assert_eq!(example, json!({"count": 0, "name": ""}));
        assert!(doc.response.example.contains("\n    \"count\": 0"));
    }

    #[test]
    fn test_response_wraps_into_data() {
        let (mut walker, unit) = walker_for(
            r#"
                pub struct HttpCode {
                    /// 错误代码
                    pub errcode: i32,
                }
                pub struct Book {
                    /// 书名
                    pub title: String,
                }
            "#,
        );
        let mut parser = AnnotationParser::new(ApiDoc::new()).with_types(&mut walker, unit);
        parser.apply_line("", "@resp HttpCode{}").unwrap();
        parser.apply_line("", "@resp Book{}").unwrap();
        parser.apply_line("", r#"@resp_fail errmsg string "错误说明""#).unwrap();
        let doc = parser.into_doc();

        let example: Value = serde_json::from_str(&doc.response.example).unwrap();
        assert_eq!(example, json!({"errcode": 0, "data": {"title": "书名"}}));
        assert_eq!(doc.response.params.len(), 2);
        assert_eq!(doc.response_fail.params[0].kind, CoarseType::String);
        assert_eq!(doc.response_fail.example, "");
    }

    #[test]
    fn test_param_json_for_json_mode() {
        let (mut walker, unit) = walker_for(
            r#"
                pub struct Book {
                    #[validate(required)]
                    pub title: Option<String>,
                    pub pages: Option<i32>,
                }
            "#,
        );
        let mut parser = AnnotationParser::new(ApiDoc::new()).with_types(&mut walker, unit);
        parser.apply_line("create", "@url POST /books").unwrap();
        parser.apply_line("create", "@param Book{}").unwrap();
        let doc = parser.into_doc();

        assert_eq!(doc.request.params.len(), 2);
        assert!(doc.request.params[0].required);
        assert!(!doc.request.params[1].required);
        assert_eq!(doc.request.params[1].value, "0");
        let json: Value = serde_json::from_str(&doc.request.param_json).unwrap();
        assert_eq!(json, json!({"title": "", "pages": 0}));
    }

    #[test]
    fn test_unresolved_type_reference_is_empty() {
        let (mut walker, unit) = walker_for("pub type Id = i64;");
        let mut parser = AnnotationParser::new(ApiDoc::new()).with_types(&mut walker, unit);
        parser.apply_line("", "@param Missing{}").unwrap();
        parser.apply_line("", "@param Id{}").unwrap();
        parser.apply_line("", "@resp {}").unwrap();
        let doc = parser.into_doc();

        assert!(doc.request.params.is_empty());
        assert!(doc.response.params.is_empty());
        assert_eq!(doc.response.example, "");

        // Without a type context references expand to nothing
        let doc = apply("", &["@resp Summary{}"]);
        assert!(doc.response.params.is_empty());
    }

    #[test]
    fn test_unknown_attributes_and_prose_are_ignored() {
        let doc = apply("list", &["", "   ", "@deprecated yes", "就是一段说明", "/ * @foo"]);
        assert_eq!(doc, ApiDoc::new());
        assert_eq!(
            Attribute::from("@RESP"),
            Attribute::Response
        );
    }
}
