use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use futures::TryStreamExt;
use tempfile::TempDir;

use videohub::db;
use videohub::db::models::{from_micros, ContentItem, ContentStatus};
use videohub::listing::{fetch_page, items, pages, CategoryFilter, ContentQuery};
use videohub::store::{ContentRepo, DocumentStore, MemoryStore, SortField, SortOrder, SqliteStore};

const T0: i64 = 1_700_000_000_000_000;

fn video(id: &str, category: &str, offset_secs: i64) -> ContentItem {
    let at = from_micros(T0) + Duration::seconds(offset_secs);
    ContentItem {
        id: id.to_string(),
        title: format!("Video {id}"),
        description: String::new(),
        media_url: format!("/media/videos/owner/{id}.mp4"),
        thumbnail_url: None,
        duration_secs: 120,
        category: category.to_string(),
        tags: vec![],
        is_premium: false,
        is_short: false,
        status: ContentStatus::Published,
        owner_id: "owner".into(),
        views: 0,
        likes: 0,
        dislikes: 0,
        created_at: at,
        updated_at: at,
    }
}

fn sqlite_store() -> (TempDir, Arc<dyn DocumentStore>) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db"))
        .expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, Arc::new(SqliteStore::new(pool)))
}

fn stores() -> Vec<(&'static str, Option<TempDir>, Arc<dyn DocumentStore>)> {
    let (dir, sqlite) = sqlite_store();
    vec![
        (
            "memory",
            None,
            Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>,
        ),
        ("sqlite", Some(dir), sqlite),
    ]
}

async fn seed(store: &dyn DocumentStore, items: &[ContentItem]) {
    for item in items {
        store.insert_content(item).await.unwrap();
    }
}

#[tokio::test]
async fn category_listing_pages_newest_first() {
    for (name, _dir, store) in stores() {
        let mut draft = video("draft", "Müzik", 40);
        draft.status = ContentStatus::Processing;
        seed(
            store.as_ref(),
            &[
                video("t1", "Müzik", 10),
                video("t2", "Müzik", 20),
                video("t3", "Müzik", 30),
                video("other", "Spor", 50),
                draft,
            ],
        )
        .await;

        let query = ContentQuery::new(2)
            .category(CategoryFilter::Named("Müzik".into()))
            .sort_by(SortField::CreatedAt, SortOrder::Desc);

        let first = fetch_page(store.as_ref(), &query).await.unwrap();
        let ids: Vec<&str> = first.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2"], "{name}: first page");
        assert!(first.has_more, "{name}: first page has more");

        let second = fetch_page(store.as_ref(), &query.clone().starting_after(first.next_cursor))
            .await
            .unwrap();
        let ids: Vec<&str> = second.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t1"], "{name}: second page");
        assert!(!second.has_more, "{name}: second page is last");
        assert!(second.next_cursor.is_none());
    }
}

#[tokio::test]
async fn paging_to_the_end_yields_every_item_once() {
    for (name, _dir, store) in stores() {
        // Several items share a timestamp so ties must be broken by id.
        let mut seeded = Vec::new();
        for i in 0..7 {
            seeded.push(video(&format!("v{i}"), "Komedi", (i / 3) as i64));
        }
        seed(store.as_ref(), &seeded).await;

        for (page_size, expected_sizes) in [(3usize, vec![3, 3, 1]), (7, vec![7, 0]), (10, vec![7])] {
            let collected: Vec<_> = pages(store.as_ref(), ContentQuery::new(page_size))
                .try_collect()
                .await
                .unwrap();
            let sizes: Vec<usize> = collected.iter().map(|p| p.items.len()).collect();
            assert_eq!(sizes, expected_sizes, "{name}: page sizes for {page_size}");

            let ids: Vec<String> = collected
                .iter()
                .flat_map(|p| p.items.iter().map(|i| i.id.clone()))
                .collect();
            let unique: HashSet<&String> = ids.iter().collect();
            assert_eq!(ids.len(), 7, "{name}");
            assert_eq!(unique.len(), 7, "{name}: no duplicates");
        }
    }
}

#[tokio::test]
async fn ascending_sort_on_views_breaks_ties_by_id() {
    for (name, _dir, store) in stores() {
        let mut a = video("a", "Spor", 1);
        a.views = 5;
        let mut b = video("b", "Spor", 2);
        b.views = 1;
        let mut c = video("c", "Spor", 3);
        c.views = 5;
        seed(store.as_ref(), &[c, a, b]).await;

        let query = ContentQuery::new(1).sort_by(SortField::Views, SortOrder::Asc);
        let ids: Vec<String> = items(store.as_ref(), query)
            .map_ok(|item| item.id)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec!["b", "a", "c"], "{name}");
    }
}

#[tokio::test]
async fn search_filters_each_page_without_skipping() {
    for (name, _dir, store) in stores() {
        let mut seeded = Vec::new();
        for i in 0..6 {
            let mut item = video(&format!("v{i}"), "Müzik", i);
            if i % 2 == 0 {
                item.title = format!("Akustik Gitar dersi {i}");
            }
            if i == 5 {
                item.tags = vec!["gitar".into()];
            }
            seeded.push(item);
        }
        seed(store.as_ref(), &seeded).await;

        let query = ContentQuery::new(2).search("gitar");
        let collected: Vec<_> = pages(store.as_ref(), query.clone())
            .try_collect()
            .await
            .unwrap();

        // A page can come back short while more data remains.
        assert!(
            collected.iter().any(|p| p.items.len() < 2 && p.has_more),
            "{name}: expected a short page that still has more"
        );

        let found: Vec<String> = collected
            .iter()
            .flat_map(|p| p.items.iter().map(|i| i.id.clone()))
            .collect();
        let all: Vec<ContentItem> = items(store.as_ref(), ContentQuery::new(50))
            .try_collect()
            .await
            .unwrap();
        let needle = query.search_needle().unwrap();
        let expected: Vec<String> = all
            .into_iter()
            .filter(|i| i.matches_text(&needle))
            .map(|i| i.id)
            .collect();
        assert_eq!(found, expected, "{name}");
        assert_eq!(found, vec!["v5", "v4", "v2", "v0"], "{name}");
    }
}

#[tokio::test]
async fn flag_and_owner_filters_combine() {
    for (name, _dir, store) in stores() {
        let mut premium_short = video("ps", "Spor", 1);
        premium_short.is_premium = true;
        premium_short.is_short = true;
        let mut premium = video("p", "Spor", 2);
        premium.is_premium = true;
        let mut mine = video("mine", "Spor", 3);
        mine.owner_id = "me".into();
        seed(store.as_ref(), &[premium_short, premium, mine]).await;

        let page = fetch_page(store.as_ref(), &ContentQuery::new(10).premium(true).short(true))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1, "{name}");
        assert_eq!(page.items[0].id, "ps");

        let page = fetch_page(store.as_ref(), &ContentQuery::new(10).owner("me"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1, "{name}");
        assert_eq!(page.items[0].id, "mine");
    }
}
