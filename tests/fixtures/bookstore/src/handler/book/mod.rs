mod vo;

pub use vo::*;

use crate::comm;
use crate::model::book;
use axum::extract::{Form, Query};
use axum::Json;

/// 书籍管理
/// @catalog 测试文档/书籍
/// @header Authorization string true "bearer {{TOKEN}}" "用户登录凭证"
/// @resp comm::HttpCode{}
pub struct Handler;

impl Handler {
    /// List 获取书籍列表
    /// @url GET {{BASEURL}}/api/v1/book/list
    /// @param ListReq{}
    /// @resp ListRsp{}
    pub async fn list(Query(req): Query<ListReq>) -> Json<ListRsp> {
        todo!("{:?}", req)
    }

    /// Detail 获取书籍详情
    /// @url GET {{BASEURL}}/api/v1/book/detail
    /// @param id string true "1" "书籍ID"
    /// @resp Detail{}
    pub async fn detail(Query(id): Query<String>) -> Json<Detail> {
        todo!("{}", id)
    }

    /// CreateOrUpdate 创建或更新书籍
    /// @url POST {{BASEURL}}/api/v1/book/save
    /// @param book::Book{}
    /// @resp_fail comm::HttpCode{}
    pub async fn create_or_update(Json(book): Json<book::Book>) -> Json<book::Book> {
        Json(book)
    }

    /// Delete 删除书籍
    /// @url POST {{BASEURL}}/api/v1/book/delete
    /// @param_mode formdata
    /// @param id string true "" "书籍ID"
    /// @api_status 3
    pub async fn delete(Form(id): Form<String>) -> Json<comm::HttpCode> {
        todo!("{}", id)
    }

    /// 校验书籍是否存在
    fn exists(_id: book::Id) -> bool {
        true
    }
}
