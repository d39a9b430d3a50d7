use apidoc_from_source::{
    api_doc::{ApiDoc, ApiStatus, CoarseType, ParamMode},
    assembler::{generate, ScanConfig},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;

fn bookstore() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/bookstore")
}

fn handler_docs() -> Vec<ApiDoc> {
    generate(&ScanConfig::new(bookstore().join("src/handler"))).expect("Failed to generate documents")
}

fn doc<'a>(docs: &'a [ApiDoc], title: &str) -> &'a ApiDoc {
    docs.iter()
        .find(|d| d.title == title)
        .unwrap_or_else(|| panic!("no document titled {}", title))
}

fn example(text: &str) -> Value {
    serde_json::from_str(text).expect("example is not JSON")
}

fn book_example() -> Value {
    json!({
        "id": "书籍ID",
        "title": "书名",
        "author": "作者",
        "type": "novel",
        "price": 0.0,
        "tags": [""]
    })
}

#[test]
fn test_bookstore_documents_in_declaration_order() {
    let docs = handler_docs();

    let summary: Vec<(u32, &str, &str, &str)> = docs
        .iter()
        .map(|d| {
            (
                d.order,
                d.title.as_str(),
                d.request.method.as_str(),
                d.request.url.as_str(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, "获取书籍列表", "get", "{{BASEURL}}/api/v1/book/list"),
            (2, "获取书籍详情", "get", "{{BASEURL}}/api/v1/book/detail"),
            (3, "创建或更新书籍", "post", "{{BASEURL}}/api/v1/book/save"),
            (4, "删除书籍", "post", "{{BASEURL}}/api/v1/book/delete"),
        ]
    );

    for d in &docs {
        assert_eq!(d.catalog, "测试文档/书籍");
        assert_eq!(d.name(), format!("测试文档/书籍/{}", d.title));
        assert_eq!(d.request.headers.len(), 1);
        let header = &d.request.headers[0];
        assert_eq!(header.name, "Authorization");
        assert_eq!(header.kind, CoarseType::String);
        assert!(header.required);
        assert_eq!(header.value, "bearer {{TOKEN}}");
        assert_eq!(header.remark, "用户登录凭证");
    }
}

#[test]
fn test_list_expands_request_and_wraps_response() {
    let docs = handler_docs();
    let list = doc(&docs, "获取书籍列表");

    assert_eq!(list.request.param_mode, ParamMode::UrlEncoded);
    assert!(list.request.params.is_empty());
    assert!(list.request.param_json.is_empty());
    let query: Vec<(&str, CoarseType, &str)> = list
        .request
        .query
        .iter()
        .map(|p| (p.name.as_str(), p.kind, p.remark.as_str()))
        .collect();
    assert_eq!(
        query,
        vec![
            ("page", CoarseType::Int, "第几页"),
            ("page_size", CoarseType::Int, "每页条数"),
            ("keyword", CoarseType::String, "关键字"),
        ]
    );

    let params: Vec<&str> = list.response.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        params,
        vec![
            "errcode",
            "errmsg",
            "total_count",
            "list",
            "list.id",
            "list.title",
            "list.author",
            "list.type",
            "list.price",
            "list.tags",
            "list.review_count",
        ]
    );
    assert_eq!(list.response.params[2].kind, CoarseType::Long);
    assert_eq!(list.response.params[3].kind, CoarseType::Array);
    assert_eq!(list.response.params[4].kind, CoarseType::String);

    let mut item = book_example();
    item["review_count"] = json!(0);
    assert_eq!(
        example(&list.response.example),
        json!({
            "errcode": 0,
            "errmsg": "错误说明",
            "data": {
                "total_count": 0,
                "list": [item]
            }
        })
    );
}

#[test]
fn test_detail_follows_aliased_imports_and_cycles() {
    let docs = handler_docs();
    let detail = doc(&docs, "获取书籍详情");

    assert_eq!(detail.request.query.len(), 1);
    assert_eq!(detail.request.query[0].name, "id");
    assert_eq!(detail.request.query[0].value, "1");

    let params: Vec<&str> = detail.response.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        params,
        vec![
            "errcode",
            "errmsg",
            "book",
            "book.id",
            "book.title",
            "book.author",
            "book.type",
            "book.price",
            "book.tags",
            "topReviews",
            "topReviews.id",
            "topReviews.content",
            "topReviews.nickname",
            "topReviews.replies",
            "updatedAt",
        ]
    );
    // `book::Id` is an alias of i64
    assert_eq!(detail.response.params[10].kind, CoarseType::Long);

    assert_eq!(
        example(&detail.response.example)["data"],
        json!({
            "book": book_example(),
            "topReviews": [{
                "id": 0,
                "content": "评论内容",
                "nickname": "评论人",
                "replies": []
            }],
            "updatedAt": ""
        })
    );
}

#[test]
fn test_post_body_from_type_in_another_module() {
    let docs = handler_docs();
    let save = doc(&docs, "创建或更新书籍");

    assert_eq!(save.request.param_mode, ParamMode::Json);
    assert!(save.request.query.is_empty());
    let params: Vec<(&str, bool)> = save
        .request
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.required))
        .collect();
    assert_eq!(
        params,
        vec![
            ("id", false),
            ("title", true),
            ("author", false),
            ("type", false),
            ("price", false),
            ("tags", false),
        ]
    );
    assert_eq!(example(&save.request.param_json), book_example());

    // The success response is inherited untouched, the failure one is declared here
    assert_eq!(save.response.params.len(), 2);
    assert_eq!(
        save.response_fail.example,
        "{\n    \"errcode\": 0,\n    \"errmsg\": \"错误说明\"\n}"
    );
    assert_eq!(save.response_fail.params.len(), 2);
}

#[test]
fn test_form_params_and_status() {
    let docs = handler_docs();
    let delete = doc(&docs, "删除书籍");

    assert_eq!(delete.request.param_mode, ParamMode::FormData);
    assert_eq!(delete.request.api_status, ApiStatus::Completed);
    assert_eq!(delete.request.params.len(), 1);
    assert_eq!(delete.request.params[0].name, "id");
    assert!(delete.request.params[0].required);
    assert!(delete.request.param_json.is_empty());
}

#[test]
fn test_scanning_crate_root_finds_the_same_documents() {
    let from_root = generate(&ScanConfig::new(bookstore())).unwrap();
    let from_handler = handler_docs();

    assert_eq!(from_root, from_handler);
}

#[test]
fn test_serialized_output() {
    let docs = handler_docs();

    let json: Value = serde_json::from_str(&serialize_json(&docs).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
    assert_eq!(json[0]["request"]["param_mode"], "urlencoded");
    assert_eq!(json[2]["request"]["param_mode"], "json");
    assert_eq!(json[3]["request"]["api_status"], "3");
    assert_eq!(json[0]["request"]["query"][0]["type"], "int");

    let yaml = serialize_yaml(&docs).unwrap();
    assert!(yaml.contains("title: 获取书籍列表"));
    assert!(yaml.contains("catalog: 测试文档/书籍"));
    let parsed: Vec<ApiDoc> = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, docs);
}
