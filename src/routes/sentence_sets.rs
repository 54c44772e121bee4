use actix_web::{web, HttpResponse};

use super::ApiResponse;
use crate::auth::AuthContext;
use crate::events::{SentenceSetViewed, ViewedEventDispatcher};

/// POST /sentence-sets/{id}/viewed
///
/// Always 202: the update happens later on the event worker, or not at all
/// if the queue is full.
pub async fn mark_viewed(
    context: AuthContext,
    path: web::Path<i64>,
    dispatcher: web::Data<ViewedEventDispatcher>,
) -> HttpResponse {
    let sentence_set_id = path.into_inner();
    let queued = dispatcher.dispatch(SentenceSetViewed { sentence_set_id });

    tracing::debug!(
        user = %context.identifier(),
        sentence_set_id,
        queued,
        "Sentence set viewed"
    );
    HttpResponse::Accepted().json(ApiResponse::accepted(sentence_set_id))
}
