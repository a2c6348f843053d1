/// End-to-end resolution: category → stored line → rendered → substituted.

mod common;

use common::phrase_db;
use phrase_engine::core::config::EngineConfig;
use phrase_engine::storage::registry::Server;
use phrase_engine::{Category, PhraseEngine, Placeholders, RenderContext, ResolveError};
use rand::rngs::StdRng;
use rand::SeedableRng;

const TEST_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_config.ron");

fn engine(path: &std::path::Path) -> PhraseEngine {
    PhraseEngine::builder()
        .database(path)
        .config_file(TEST_CONFIG)
        .build()
        .expect("Failed to build engine")
}

fn chat_context() -> RenderContext {
    RenderContext::new()
        .with_bot("meatbot", "Meat")
        .with_user("ana", "Ana", "@ana")
        .with_channel("general")
        .with_server("Lounge")
}

#[test]
fn greeting_resolves_to_a_greeting_line() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let ctx = chat_context();
    let allowed = [
        "Hello, Ana!",
        "Hi there.",
        "Hey there.",
        "Hi there, friend.",
        "Hey there, friend.",
    ];

    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let text = engine
            .resolve_with_rng(&Category::Greeting, Some(&ctx), None, &mut rng)
            .unwrap();
        assert!(allowed.contains(&text.as_str()), "got {:?}", text);
    }
}

#[test]
fn multi_tag_category_matches_any_tag() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let text = engine
        .resolve(&Category::Mention, Some(&chat_context()), None)
        .unwrap();
    assert_eq!(text, "@ana, you rang?");
}

#[test]
fn member_left_uses_user_name() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let text = engine
        .resolve(&Category::MemberLeft, Some(&chat_context()), None)
        .unwrap();
    assert_eq!(text, "Goodbye, ana.");
}

#[test]
fn action_marker_falls_back_to_configured_default() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);

    let text = engine
        .resolve(&Category::WentOnline, Some(&chat_context()), None)
        .unwrap();
    assert_eq!(text, "* yawns in general");

    let ctx = chat_context().with_action_marker("/me");
    let text = engine.resolve(&Category::WentOnline, Some(&ctx), None).unwrap();
    assert_eq!(text, "/me yawns in general");
}

#[test]
fn case_regions_and_choices_render() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let text = engine
            .resolve_with_rng(&Category::Shutdown, None, None, &mut rng)
            .unwrap();
        assert!(
            text == "SHUTTING DOWN. Bye!" || text == "SHUTTING DOWN. Later!",
            "got {:?}",
            text
        );
    }
}

#[test]
fn broken_template_is_an_error() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let err = engine
        .resolve(&Category::from_name("broken"), None, None)
        .unwrap_err();
    assert!(matches!(err, ResolveError::Template(_)));
}

#[test]
fn unknown_category_uses_fallback_source() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let text = engine
        .resolve(&Category::from_name("birthday"), None, None)
        .unwrap();
    assert_eq!(text, "...");
}

#[test]
fn nothing_matching_without_fallback_is_empty() {
    let (_dir, path) = phrase_db();
    let mut config = EngineConfig::default();
    config.categories.remove("shutdown");
    let engine = PhraseEngine::builder()
        .database(&path)
        .with_config(config)
        .build()
        .unwrap();

    assert_eq!(engine.resolve(&Category::Shutdown, None, None).unwrap(), "");
    assert_eq!(
        engine.resolve(&Category::from_name("birthday"), None, None).unwrap(),
        ""
    );
}

#[test]
fn unreachable_database_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PhraseEngine::builder()
        .database(dir.path().join("missing.sqlite3"))
        .build()
        .unwrap();
    assert_eq!(engine.resolve(&Category::Greeting, None, None).unwrap(), "");
}

#[test]
fn unrelated_bad_tags_do_not_break_other_categories() {
    let (_dir, path) = phrase_db();
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute("INSERT INTO phrases (id, line, category_id) VALUES (99, 'x', '')", [])
        .unwrap();
    let engine = engine(&path);

    let text = engine
        .resolve(&Category::Mention, Some(&chat_context()), None)
        .unwrap();
    assert_eq!(text, "@ana, you rang?");
    assert!(!engine.resolve(&Category::Greeting, None, None).unwrap().is_empty());
}

#[test]
fn locked_database_is_silent() {
    let (_dir, path) = phrase_db();
    let writer = rusqlite::Connection::open(&path).unwrap();
    writer
        .execute_batch("BEGIN EXCLUSIVE; UPDATE phrases SET line = line WHERE id = 1;")
        .unwrap();

    let engine = engine(&path);
    assert_eq!(engine.resolve(&Category::Greeting, None, None).unwrap(), "");

    writer.execute_batch("ROLLBACK;").unwrap();
    assert!(!engine.resolve(&Category::Greeting, None, None).unwrap().is_empty());
}

#[test]
fn extra_placeholders_override_context() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    let extra = Placeholders::new()
        .with("%channel%", "random")
        .with("%item%", "a sword");

    let text = engine
        .format(
            "%botnick% hands %nick% %item% in %channel% on %server%",
            Some(&chat_context()),
            Some(&extra),
        )
        .unwrap();
    assert_eq!(text, "Meat hands Ana a sword in random on Lounge");
}

#[test]
fn format_without_context_blanks_tokens() {
    let (_dir, path) = phrase_db();
    let engine = engine(&path);
    assert_eq!(engine.format("hi %nick%!", None, None).unwrap(), "hi !");
    assert!(matches!(
        engine.format("{oops", None, None),
        Err(ResolveError::Template(_))
    ));
}

#[test]
fn registries_share_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bot.sqlite3");
    let engine = PhraseEngine::builder()
        .database(&path)
        .registries()
        .build()
        .unwrap();

    let servers = engine.servers().unwrap();
    servers
        .add_server(&Server {
            id: "7".to_string(),
            name: "Lounge".to_string(),
        })
        .unwrap();
    assert_eq!(servers.servers().unwrap().len(), 1);

    let playlists = engine.playlists().unwrap();
    let song = playlists.add_song("https://example.com/song").unwrap();
    let list = playlists.add_playlist("mix", "ana").unwrap();
    assert_eq!(playlists.add_playlist_song(song, list).unwrap(), 0);
}

#[test]
fn builder_requires_a_store() {
    assert!(matches!(
        PhraseEngine::builder().build(),
        Err(ResolveError::Config(_))
    ));
    assert!(matches!(
        PhraseEngine::builder().registries().build(),
        Err(ResolveError::Config(_))
    ));
}
