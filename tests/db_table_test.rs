use chrono::Utc;
use pressroom::model::ArticleCounter;
use pressroom::model::ArticleModel;
use pressroom::model::FollowModel;
use pressroom::model::UserCounter;
use pressroom::model::UserModel;
use pressroom::repository::table::Table;

mod common;

// --- 1. Test Harness Macro ---
// Handles setup, execution, and teardown automatically.
macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            let ($db, db_path) = common::setup_db().await;

            $body

            common::teardown_db(db_path).await;
        }
    };
}

// --- 2. Data Fixture Macros ---

macro_rules! create_user {
    ($db:expr, $name:expr) => {
        create_user!($db, $name, {})
    };
    ($db:expr, $name:expr, { $($field:ident : $val:expr),* }) => {
        {
            #[allow(unused_mut)]
            let mut user = UserModel {
                username: $name.to_string(),
                email: format!("{}@example.com", $name),
                nickname: $name.to_string(),
                ..Default::default()
            };
            $(user.$field = $val.into();)* $db.user.insert(&user).await.expect("Failed to insert user")
        }
    };
}

macro_rules! create_article {
    ($db:expr, $author_id:expr, $title:expr) => {
        $db.article
            .insert(&ArticleModel {
                title: $title.to_string(),
                content: format!("{} body", $title),
                author_id: $author_id,
                ..Default::default()
            })
            .await
            .expect("Failed to insert article")
    };
}

macro_rules! create_follow {
    ($db:expr, $follower:expr, $followee:expr) => {
        $db.follow
            .insert(&FollowModel {
                follower_id: $follower,
                followee_id: $followee,
                ..Default::default()
            })
            .await
            .expect("Failed to insert follow")
    };
}

mod user_table_tests {
    use super::*;

    db_test!(insert_and_select, |db| {
        let id = create_user!(db, "ada", { bio: "Analyst" });

        let user = db.user.select(&id).await.unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.bio, "Analyst");
        assert!(user.is_active);
        assert_eq!(user.article_count, 0);
        assert_eq!(user.following_count, 0);

        let by_name = db.user.select_by_username("ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert!(db.user.exists_by_username("ada").await.unwrap());
        assert!(!db.user.exists_by_username("bob").await.unwrap());
    });

    db_test!(duplicate_username_is_rejected, |db| {
        create_user!(db, "ada");
        let duplicate = UserModel {
            username: "ada".to_string(),
            ..Default::default()
        };
        assert!(db.user.insert(&duplicate).await.is_err());
    });

    db_test!(update_leaves_counters_alone, |db| {
        let id = create_user!(db, "ada");
        let mut stale = db.user.select(&id).await.unwrap().unwrap();

        assert!(db
            .user
            .increment_counter(id, UserCounter::Articles, 3)
            .await
            .unwrap());
        stale.nickname = "Countess".to_string();
        stale.article_count = 99;
        db.user.update(&stale).await.unwrap();

        let fetched = db.user.select(&id).await.unwrap().unwrap();
        assert_eq!(fetched.nickname, "Countess");
        assert_eq!(fetched.article_count, 3);
    });

    db_test!(increment_counter_targets_one_column, |db| {
        let id = create_user!(db, "ada");

        db.user
            .increment_counter(id, UserCounter::Followers, 2)
            .await
            .unwrap();
        db.user
            .increment_counter(id, UserCounter::Followers, -1)
            .await
            .unwrap();
        db.user
            .increment_counter(id, UserCounter::Stars, 5)
            .await
            .unwrap();

        let user = db.user.select(&id).await.unwrap().unwrap();
        assert_eq!(user.follower_count, 1);
        assert_eq!(user.star_count, 5);
        assert_eq!(user.following_count, 0);
        assert_eq!(UserCounter::Stars.read(&user), 5);
    });

    db_test!(increment_counter_on_missing_user, |db| {
        let updated = db
            .user
            .increment_counter(404, UserCounter::Articles, 1)
            .await
            .unwrap();
        assert!(!updated);
    });

    db_test!(set_counter_and_last_login, |db| {
        let id = create_user!(db, "ada");
        let now = Utc::now();

        assert!(db.user.set_counter(id, UserCounter::Comments, 7).await.unwrap());
        assert!(db.user.set_last_login(id, &now).await.unwrap());
        assert!(!db.user.set_last_login(id + 1, &now).await.unwrap());

        let user = db.user.select(&id).await.unwrap().unwrap();
        assert_eq!(user.comment_count, 7);
        assert_eq!(user.last_login.map(|t| t.timestamp()), Some(now.timestamp()));
    });

    db_test!(delete, |db| {
        let id = create_user!(db, "ada");
        assert!(db.user.delete(&id).await.unwrap());
        assert!(!db.user.delete(&id).await.unwrap());
        assert!(db.user.select(&id).await.unwrap().is_none());
    });
}

mod article_table_tests {
    use super::*;

    db_test!(insert_and_count_by_author, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        create_article!(db, ada, "One");
        create_article!(db, ada, "Two");
        create_article!(db, bob, "Three");

        assert_eq!(db.article.count_by_author(ada).await.unwrap(), 2);
        assert_eq!(db.article.count_by_author(bob).await.unwrap(), 1);
        assert_eq!(db.article.select_by_author(ada).await.unwrap().len(), 2);
        assert_eq!(db.article.select_all().await.unwrap().len(), 3);
    });

    db_test!(increment_view_counter, |db| {
        let ada = create_user!(db, "ada");
        let id = create_article!(db, ada, "One");

        for _ in 0..3 {
            assert!(db
                .article
                .increment_counter(id, ArticleCounter::Views, 1)
                .await
                .unwrap());
        }
        assert!(!db
            .article
            .increment_counter(id + 1, ArticleCounter::Views, 1)
            .await
            .unwrap());

        let article = db.article.select(&id).await.unwrap().unwrap();
        assert_eq!(article.view_count, 3);
        assert_eq!(article.like_count, 0);
    });

    db_test!(deleting_author_cascades, |db| {
        let ada = create_user!(db, "ada");
        let id = create_article!(db, ada, "One");

        db.user.delete(&ada).await.unwrap();
        assert!(db.article.select(&id).await.unwrap().is_none());
    });
}

mod follow_table_tests {
    use super::*;

    db_test!(pair_lookup_and_counts, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        let cat = create_user!(db, "cat");
        create_follow!(db, ada, bob);
        create_follow!(db, cat, bob);
        create_follow!(db, bob, ada);

        assert!(db.follow.select_pair(ada, bob).await.unwrap().is_some());
        assert!(db.follow.select_pair(bob, cat).await.unwrap().is_none());
        assert_eq!(db.follow.count_followers(bob).await.unwrap(), 2);
        assert_eq!(db.follow.count_following(bob).await.unwrap(), 1);
        assert_eq!(db.follow.count_following(cat).await.unwrap(), 1);
    });

    db_test!(duplicate_pair_is_rejected, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        create_follow!(db, ada, bob);

        let again = FollowModel {
            follower_id: ada,
            followee_id: bob,
            ..Default::default()
        };
        assert!(db.follow.insert(&again).await.is_err());
    });

    db_test!(adjust_follow_counts_is_all_or_nothing, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");

        assert_eq!(db.user.adjust_follow_counts(ada, bob, 1).await.unwrap(), None);
        assert_eq!(
            db.user.adjust_follow_counts(ada, 404, 1).await.unwrap(),
            Some(404)
        );

        let ada_row = db.user.select(&ada).await.unwrap().unwrap();
        let bob_row = db.user.select(&bob).await.unwrap().unwrap();
        assert_eq!(ada_row.following_count, 1);
        assert_eq!(bob_row.follower_count, 1);
    });

    db_test!(delete_account_releases_follow_counts, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        let cat = create_user!(db, "cat");
        create_follow!(db, ada, bob);
        create_follow!(db, bob, ada);
        create_follow!(db, cat, ada);
        db.user.adjust_follow_counts(ada, bob, 1).await.unwrap();
        db.user.adjust_follow_counts(bob, ada, 1).await.unwrap();
        db.user.adjust_follow_counts(cat, ada, 1).await.unwrap();

        assert!(db.user.delete_account(ada).await.unwrap());
        assert!(!db.user.delete_account(ada).await.unwrap());

        let bob_row = db.user.select(&bob).await.unwrap().unwrap();
        let cat_row = db.user.select(&cat).await.unwrap().unwrap();
        assert_eq!((bob_row.follower_count, bob_row.following_count), (0, 0));
        assert_eq!(cat_row.following_count, 0);
        assert_eq!(db.follow.count_followers(bob).await.unwrap(), 0);
    });

    db_test!(delete_pair, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        create_follow!(db, ada, bob);

        assert!(db.follow.delete_pair(ada, bob).await.unwrap());
        assert!(!db.follow.delete_pair(ada, bob).await.unwrap());
        assert_eq!(db.follow.count_followers(bob).await.unwrap(), 0);
    });
}

mod repository_tests {
    use super::*;

    db_test!(delete_all_tables, |db| {
        let ada = create_user!(db, "ada");
        let bob = create_user!(db, "bob");
        create_article!(db, ada, "One");
        create_follow!(db, ada, bob);

        db.delete_all_tables().await.unwrap();

        assert!(db.user.select_all().await.unwrap().is_empty());
        assert!(db.article.select_all().await.unwrap().is_empty());
        assert!(db.follow.select_all().await.unwrap().is_empty());
    });
}
