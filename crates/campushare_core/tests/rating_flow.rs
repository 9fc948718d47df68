//! Rating aggregates across services.

use campushare_core::models::{rounded_average, NewComment};
use campushare_core::{CoreError, PageRequest, RatingTarget};
use campushare_testkit::prelude::*;
use proptest::prelude::*;

#[tokio::test]
async fn course_and_resource_averages_are_independent() {
    let campus = scenarios::campus().await;
    let resource = campus.approved_resource("week 1").await;
    let ratings = &campus.services.ratings;

    ratings
        .rate(&campus.student(), RatingTarget::Course(campus.course.id), 5)
        .await
        .unwrap();
    ratings
        .rate(&campus.student(), RatingTarget::Resource(resource.id), 1)
        .await
        .unwrap();
    ratings
        .rate(&campus.other_student(), RatingTarget::Resource(resource.id), 4)
        .await
        .unwrap();

    let course = campus.services.courses.get(campus.course.id).await.unwrap();
    assert_eq!(course.rating_avg, 5.0);
    assert_eq!(course.rating_count, 1);

    let resource = campus
        .services
        .resources
        .get(None, resource.id)
        .await
        .unwrap();
    assert_eq!(resource.rating_avg, 2.5);
    assert_eq!(resource.rating_count, 2);
}

#[tokio::test]
async fn deleting_a_resource_drops_its_ratings() {
    let campus = scenarios::campus().await;
    let resource = campus.approved_resource("to delete").await;
    let target = RatingTarget::Resource(resource.id);

    campus
        .services
        .ratings
        .rate(&campus.student(), target, 3)
        .await
        .unwrap();
    campus
        .services
        .resources
        .delete(&campus.teacher(), resource.id)
        .await
        .unwrap();

    let page = campus
        .services
        .ratings
        .list(target, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(campus.test_db.stats().await.unwrap().ratings, 0);
}

#[tokio::test]
async fn rejected_score_leaves_aggregate_untouched() {
    let campus = scenarios::campus().await;
    let target = RatingTarget::Course(campus.course.id);
    let ratings = &campus.services.ratings;

    ratings.rate(&campus.student(), target, 4).await.unwrap();
    let result = ratings.rate(&campus.student(), target, 9).await;
    assert!(matches!(result, Err(CoreError::Validation { .. })));

    let mine = ratings.get_mine(&campus.student(), target).await.unwrap();
    assert_eq!(mine.map(|r| r.score), Some(4));
    let course = campus.services.courses.get(campus.course.id).await.unwrap();
    assert_eq!((course.rating_avg, course.rating_count), (4.0, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_engagement_keeps_counters_consistent() {
    const USERS: usize = 12;
    let campus = scenarios::campus_in(TestDatabase::file().await).await;
    let resource = campus.approved_resource("shared notes").await;

    let mut raters = Vec::new();
    for i in 0..USERS {
        let user = campus
            .services
            .users
            .register(new_user(&format!("busy{i}")))
            .await
            .unwrap();
        raters.push((actor(&user), (i % 5 + 1) as i64));
    }

    let mut tasks = Vec::new();
    for (rater, score) in raters.iter().copied() {
        let services = campus.services.clone();
        let course_id = campus.course.id;
        let resource_id = resource.id;
        tasks.push(tokio::spawn(async move {
            let (course, resource, favorite, comment) = tokio::join!(
                services
                    .ratings
                    .rate(&rater, RatingTarget::Course(course_id), score),
                services
                    .ratings
                    .rate(&rater, RatingTarget::Resource(resource_id), score),
                services.favorites.add(&rater, resource_id),
                services.comments.create(
                    &rater,
                    resource_id,
                    NewComment {
                        content: format!("thanks from {}", rater.user_id),
                        parent_id: None,
                    },
                ),
            );
            course?;
            resource?;
            favorite?;
            comment?;
            Ok::<_, CoreError>(())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let total: i64 = raters.iter().map(|(_, score)| score).sum();
    let expected = rounded_average(total, USERS as i64);

    let course = campus.services.courses.get(campus.course.id).await.unwrap();
    assert_eq!(course.rating_count, USERS as i64);
    assert_eq!(course.rating_avg, expected);

    let resource = campus
        .services
        .resources
        .get(None, resource.id)
        .await
        .unwrap();
    assert_eq!(resource.rating_count, USERS as i64);
    assert_eq!(resource.rating_avg, expected);
    assert_eq!(resource.favorite_count, USERS as i64);
    assert_eq!(resource.comment_count, USERS as i64);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stored_average_matches_scores(scores in scores_strategy(12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let test_db = TestDatabase::memory().await;
            let services = test_db.services();
            let admin = services.users.create_admin(new_user("rater_admin")).await.unwrap();
            let course = services
                .courses
                .create(&actor(&admin), new_course("PT100"))
                .await
                .unwrap();

            let mut last = None;
            for (i, score) in scores.iter().enumerate() {
                let rater = services
                    .users
                    .register(new_user(&format!("rater{i}")))
                    .await
                    .unwrap();
                last = Some(
                    services
                        .ratings
                        .rate(&actor(&rater), RatingTarget::Course(course.id), *score)
                        .await
                        .unwrap(),
                );
            }

            let summary = last.unwrap();
            let total: i64 = scores.iter().sum();
            prop_assert_eq!(summary.count, scores.len() as i64);
            prop_assert_eq!(summary.average, rounded_average(total, scores.len() as i64));

            let stored = services.courses.get(course.id).await.unwrap();
            prop_assert_eq!(stored.rating_avg, summary.average);
            prop_assert_eq!(stored.rating_count, summary.count);
            Ok(())
        })?;
    }
}
