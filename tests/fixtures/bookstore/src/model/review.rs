use super::book;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Reviewer {
    /// 评论人
    pub nickname: String,
}

#[derive(Debug, Serialize)]
pub struct Review {
    /// 评论ID
    pub id: book::Id,
    /// 评论内容
    pub content: String,
    #[serde(flatten)]
    pub reviewer: Reviewer,
    /// 回复
    pub replies: Vec<Box<Review>>,
}
