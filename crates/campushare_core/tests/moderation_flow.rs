//! Upload, review and engagement across services.

use campushare_core::models::{NewComment, NewReview, ResourceFilter, UpdateResource};
use campushare_core::{CoreError, PageRequest, ResourceStatus, ReviewDecision};
use campushare_testkit::prelude::*;

fn approve() -> NewReview {
    NewReview {
        decision: ReviewDecision::Approved,
        reason: None,
    }
}

fn by_course(course_id: i64) -> ResourceFilter {
    ResourceFilter {
        course_id: Some(course_id),
        ..Default::default()
    }
}

#[tokio::test]
async fn student_upload_goes_through_review() {
    let campus = scenarios::campus().await;
    let services = &campus.services;
    let upload = campus.pending_resource("lab report").await;
    assert_eq!(upload.status, ResourceStatus::Pending);

    let public = services
        .resources
        .list(None, &by_course(campus.course.id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(public.total, 0);

    let queue = services
        .reviews
        .pending(&campus.teacher(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(queue.items[0].id, upload.id);

    services
        .reviews
        .review(&campus.teacher(), upload.id, approve())
        .await
        .unwrap();

    let public = services
        .resources
        .list(None, &by_course(campus.course.id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(public.total, 1);
    let course = services.courses.get(campus.course.id).await.unwrap();
    assert_eq!(course.resource_count, 1);

    // Editing sends it back to the queue.
    services
        .resources
        .update(
            &campus.student(),
            upload.id,
            UpdateResource {
                description: Some("now with figures".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let course = services.courses.get(campus.course.id).await.unwrap();
    assert_eq!(course.resource_count, 0);
    assert_eq!(
        services
            .reviews
            .history(&campus.student(), upload.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn deleting_a_resource_cascades() {
    let campus = scenarios::campus().await;
    let services = &campus.services;
    let resource = campus.approved_resource("slides").await;

    let comment = services
        .comments
        .create(
            &campus.student(),
            resource.id,
            NewComment {
                content: "thanks!".into(),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    services
        .favorites
        .add(&campus.other_student(), resource.id)
        .await
        .unwrap();

    let reloaded = services.resources.get(None, resource.id).await.unwrap();
    assert_eq!(reloaded.comment_count, 1);
    assert_eq!(reloaded.favorite_count, 1);

    services
        .resources
        .delete(&campus.teacher(), resource.id)
        .await
        .unwrap();

    assert!(matches!(
        services.comments.get(comment.id).await,
        Err(CoreError::NotFound { .. })
    ));
    let favorites = services
        .favorites
        .list(campus.other_student.id, PageRequest::default())
        .await
        .unwrap();
    assert!(favorites.is_empty());

    let stats = campus.test_db.stats().await.unwrap();
    assert_eq!(stats.resources, 0);
    assert_eq!(stats.comments, 0);
    assert_eq!(stats.favorites, 0);
    assert_eq!(services.courses.get(campus.course.id).await.unwrap().resource_count, 0);
}

#[tokio::test]
async fn course_with_resources_cannot_be_deleted() {
    let campus = scenarios::campus().await;
    let resource = campus.approved_resource("exam 2022").await;

    assert!(matches!(
        campus
            .services
            .courses
            .delete(&campus.admin(), campus.course.id)
            .await,
        Err(CoreError::Conflict { .. })
    ));

    campus
        .services
        .resources
        .delete(&campus.admin(), resource.id)
        .await
        .unwrap();
    campus
        .services
        .courses
        .delete(&campus.admin(), campus.course.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn file_database_round_trip() {
    let campus = scenarios::campus_in(TestDatabase::file().await).await;
    let resource = campus.approved_resource("persisted").await;
    let path = campus.test_db.path().unwrap();
    assert!(path.exists());

    let found = campus
        .services
        .resources
        .get(None, resource.id)
        .await
        .unwrap();
    assert_eq!(found.title, "persisted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reviewer_edit_does_not_undo_a_concurrent_decision() {
    let campus = scenarios::campus_in(TestDatabase::file().await).await;

    for round in 0..8 {
        let id = campus.pending_resource(&format!("draft {round}")).await.id;
        let (reviews, resources) = (
            campus.services.reviews.clone(),
            campus.services.resources.clone(),
        );
        let (reviewer, editor) = (campus.teacher(), campus.admin());

        let decide = tokio::spawn(async move { reviews.review(&reviewer, id, approve()).await });
        let edit = tokio::spawn(async move {
            resources
                .update(
                    &editor,
                    id,
                    UpdateResource {
                        title: Some(format!("edited {round}")),
                        ..Default::default()
                    },
                )
                .await
        });
        decide.await.unwrap().unwrap();
        edit.await.unwrap().unwrap();

        let stored = campus
            .services
            .resources
            .get(None, id)
            .await
            .unwrap();
        assert_eq!(stored.status, ResourceStatus::Approved);
        assert_eq!(stored.title, format!("edited {round}"));
    }
}
