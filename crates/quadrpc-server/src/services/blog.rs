use std::sync::Arc;

use quadrpc_common::{Outcome, Pattern, Payload, Status};
use quadrpc_core::CallHandle;
use serde::{Deserialize, Serialize};

use super::{encode, send_response, single_request};
use crate::router::Router;
use crate::store::{Blog, BlogDraft, BlogId, BlogStore, StoreError};

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub blog: BlogDraft,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogRequest {
    pub blog: Blog,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BlogIdMessage {
    pub blog_id: String,
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub blog: Blog,
}

/// CRUD over a [`BlogStore`], plus a server stream listing every blog.
pub struct BlogService {
    store: Arc<dyn BlogStore>,
}

impl BlogService {
    pub fn new(store: Arc<dyn BlogStore>) -> Self {
        Self { store }
    }

    pub fn routes(self: Arc<Self>) -> Router {
        let create = Arc::clone(&self);
        let read = Arc::clone(&self);
        let update = Arc::clone(&self);
        let delete = Arc::clone(&self);
        let list = self;

        Router::new()
            .route("blog.create_blog", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&create);
                async move { svc.create_blog(call).await }
            })
            .route("blog.read_blog", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&read);
                async move { svc.read_blog(call).await }
            })
            .route("blog.update_blog", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&update);
                async move { svc.update_blog(call).await }
            })
            .route("blog.delete_blog", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&delete);
                async move { svc.delete_blog(call).await }
            })
            .route("blog.list_blog", Pattern::ServerStream, move |call: CallHandle| {
                let svc = Arc::clone(&list);
                async move { svc.list_blog(call).await }
            })
    }

    pub async fn create_blog(&self, call: CallHandle) -> Outcome {
        let request: CreateBlogRequest = single_request(&call).await?;
        let blog = self.store.insert(request.blog).map_err(store_failed)?;
        tracing::debug!(id = %blog.id, "created blog");
        encode(&BlogResponse { blog })
    }

    pub async fn read_blog(&self, call: CallHandle) -> Outcome {
        let request: BlogIdMessage = single_request(&call).await?;
        let id = parse_id(&request.blog_id)?;
        match self.store.get(id).map_err(store_failed)? {
            Some(blog) => encode(&BlogResponse { blog }),
            None => Err(not_found(&request.blog_id)),
        }
    }

    pub async fn update_blog(&self, call: CallHandle) -> Outcome {
        let request: UpdateBlogRequest = single_request(&call).await?;
        let id = parse_id(&request.blog.id)?;
        let draft = BlogDraft {
            author_id: request.blog.author_id,
            title: request.blog.title,
            content: request.blog.content,
        };
        match self.store.update(id, draft).map_err(store_failed)? {
            Some(blog) => encode(&BlogResponse { blog }),
            None => Err(not_found(&request.blog.id)),
        }
    }

    pub async fn delete_blog(&self, call: CallHandle) -> Outcome {
        let request: BlogIdMessage = single_request(&call).await?;
        let id = parse_id(&request.blog_id)?;
        if self.store.delete(id).map_err(store_failed)? {
            encode(&request)
        } else {
            Err(not_found(&request.blog_id))
        }
    }

    /// Streams every stored blog in id order. The request body is ignored.
    pub async fn list_blog(&self, call: CallHandle) -> Outcome {
        let _: Payload = single_request(&call).await?;
        for blog in self.store.list().map_err(store_failed)? {
            send_response(&call, &BlogResponse { blog }).await?;
        }
        call.close_send();
        Ok(Payload::Null)
    }
}

fn parse_id(raw: &str) -> Result<BlogId, Status> {
    raw.parse().map_err(|_| Status::invalid_argument("cannot parse ID"))
}

fn not_found(raw: &str) -> Status {
    Status::not_found(format!("cannot find blog with the specified ID: {}", raw))
}

fn store_failed(e: StoreError) -> Status {
    tracing::warn!(error = %e, "blog store failed");
    Status::internal(format!("internal error: {}", e))
}
