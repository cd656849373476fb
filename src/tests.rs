use crate::config::{BookFormat, Config, ReaderConfig};
use crate::error::{AppError, Result};
use crate::library::{Book, LibraryStats, Progress};
use crate::reader::{self, EpubEngine, EpubReader, EpubRendition, PdfDocument, PdfEngine, PdfReader};
use crate::session::{LibraryChange, LibrarySession, UploadedFile};
use crate::store::{KeyValueStore, LocalStore, MemoryStore, SqliteStore, StoreKeys};
use crate::sync::{self, Snapshot};
use chrono::{TimeZone, Utc};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn memory_backend() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

fn session_on(backend: &Arc<dyn KeyValueStore>) -> LibrarySession {
    let store = LocalStore::new(Arc::clone(backend), StoreKeys::default());
    LibrarySession::new(store, ReaderConfig::default())
}

fn test_session() -> LibrarySession {
    LibrarySession::new(LocalStore::memory(), ReaderConfig::default())
}

fn upload(session: &mut LibrarySession, names: &[&str]) -> Vec<String> {
    session
        .upload(names.iter().map(|n| UploadedFile::new(*n, b"bytes".to_vec())))
        .unwrap()
}

struct FakePdf {
    pages: u32,
    fail: bool,
    rendered: Rc<RefCell<Vec<u32>>>,
}

impl FakePdf {
    fn new(pages: u32) -> Self {
        Self {
            pages,
            fail: false,
            rendered: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

struct FakeDoc {
    pages: u32,
    rendered: Rc<RefCell<Vec<u32>>>,
}

impl PdfEngine for FakePdf {
    type Document = FakeDoc;

    async fn load(&self, content: &str) -> Result<FakeDoc> {
        if self.fail || !content.starts_with("data:application/pdf") {
            return Err(AppError::Reader("corrupt document".to_string()));
        }
        Ok(FakeDoc {
            pages: self.pages,
            rendered: Rc::clone(&self.rendered),
        })
    }
}

impl PdfDocument for FakeDoc {
    fn page_count(&self) -> u32 {
        self.pages
    }

    async fn render_page(&mut self, page: u32, _scale: f32) -> Result<()> {
        self.rendered.borrow_mut().push(page);
        Ok(())
    }
}

#[derive(Default)]
struct FakeEpub {
    started_at: RefCell<Option<Option<String>>>,
}

struct FakeRendition {
    moves: i32,
}

impl EpubEngine for FakeEpub {
    type Rendition = FakeRendition;

    async fn display(&self, _content: &str, start: Option<&str>) -> Result<FakeRendition> {
        *self.started_at.borrow_mut() = Some(start.map(String::from));
        Ok(FakeRendition { moves: 0 })
    }
}

impl EpubRendition for FakeRendition {
    fn next(&mut self) {
        self.moves += 1;
    }

    fn prev(&mut self) {
        self.moves -= 1;
    }
}

#[test]
fn upload_skips_unsupported_files() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf", "b.txt", "c.epub"]);

    assert_eq!(ids.len(), 2);
    let books = session.books();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].filename, "a.pdf");
    assert_eq!(books[0].title, "a");
    assert_eq!(books[0].progress, Progress::Pdf { page: 1 });
    assert_eq!(books[1].filename, "c.epub");
    assert_eq!(books[1].progress, Progress::Epub { locator: None });
    assert!(books[0].content.starts_with("data:application/pdf;base64,"));
}

#[test]
fn upload_matches_extensions_case_insensitively() {
    let mut session = test_session();
    upload(&mut session, &["Report.PDF", "Novel.Epub", "archive.pdf.zip"]);

    let titles: Vec<&str> = session.books().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Report", "Novel"]);
}

#[test]
fn new_uploads_go_first() {
    let mut session = test_session();
    upload(&mut session, &["old.pdf"]);
    upload(&mut session, &["new1.pdf", "new2.epub"]);

    let names: Vec<&str> = session.books().iter().map(|b| b.filename.as_str()).collect();
    assert_eq!(names, ["new1.pdf", "new2.epub", "old.pdf"]);
}

#[test]
fn library_survives_restart() {
    let backend = memory_backend();
    let ids = {
        let mut session = session_on(&backend);
        upload(&mut session, &["a.pdf", "b.epub"])
    };

    let session = session_on(&backend);
    let reloaded: Vec<&str> = session.books().iter().map(|b| b.id.as_str()).collect();
    assert_eq!(reloaded, ids);
}

#[test]
fn corrupt_store_loads_as_empty_library() {
    let backend = memory_backend();
    let keys = StoreKeys::default();
    backend.set(&keys.books, "{not json").unwrap();

    let session = session_on(&backend);
    assert!(session.books().is_empty());
}

#[test]
fn stored_entries_are_normalized_on_load() {
    let backend = memory_backend();
    let keys = StoreKeys::default();
    backend
        .set(
            &keys.books,
            r#"[{"id":"x","title":"Old","filename":"old.epub","type":"epub","dataUrl":"data:,","progress":{"cfi":"epubcfi(/6/2)"}}]"#,
        )
        .unwrap();

    let session = session_on(&backend);
    let book = session.book("x").unwrap();
    assert_eq!(book.format(), BookFormat::Epub);
    assert_eq!(book.locator(), Some("epubcfi(/6/2)"));
    assert_eq!(book.content, "data:,");
}

#[test]
fn remove_book_and_unknown_id() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf", "b.pdf"]);

    let removed = session.remove(&ids[0]).unwrap();
    assert_eq!(removed.title, "a");
    assert_eq!(session.books().len(), 1);

    assert!(matches!(session.remove("missing"), Err(AppError::NotFound(_))));
}

#[test]
fn removing_active_book_closes_reader() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let ticket = session.open(&ids[0]).unwrap();

    session.remove(&ids[0]).unwrap();
    assert!(session.active_book().is_none());
    assert!(!session.is_current(ticket.handle()));
}

#[test]
fn search_and_stats() {
    let mut session = test_session();
    upload(&mut session, &["Dune.epub", "Taxes 2024.pdf", "dune-notes.pdf"]);

    assert_eq!(session.search("dune").len(), 2);
    assert_eq!(session.search("EPUB").len(), 1);
    assert_eq!(session.search("   ").len(), 3);
    assert!(session.search("nothing").is_empty());

    assert_eq!(
        session.stats(),
        LibraryStats {
            total: 3,
            pdf: 2,
            epub: 1
        }
    );
}

#[test]
fn progress_labels() {
    let now = Utc::now();
    let mut pdf = Book::new("a.pdf", BookFormat::Pdf, b"", now);
    pdf.progress = Progress::Pdf { page: 12 };
    let mut epub = Book::new("b.epub", BookFormat::Epub, b"", now);

    assert_eq!(pdf.progress_label(), "Page 12");
    assert_eq!(epub.progress_label(), "Start");
    epub.progress = Progress::Epub {
        locator: Some("x".to_string()),
    };
    assert_eq!(epub.progress_label(), "Saved location");
}

#[test]
fn observers_see_the_mutated_library() {
    let mut session = test_session();
    let seen: Rc<RefCell<Vec<(Option<String>, usize)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.subscribe(move |change: &LibraryChange, books: &[Book]| {
        sink.borrow_mut().push((change.notice(), books.len()));
    });

    let ids = upload(&mut session, &["a.pdf", "b.pdf"]);
    session.remove(&ids[1]).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0], (Some("2 books added".to_string()), 2));
    assert_eq!(seen[1], (Some("Removed “b”".to_string()), 1));
}

#[test]
fn malformed_code_leaves_library_untouched() {
    let backend = memory_backend();
    let mut session = session_on(&backend);
    upload(&mut session, &["a.pdf"]);
    let before = session.books().to_vec();
    let stored = backend.get(&StoreKeys::default().books).unwrap();

    let err = session.import_code("not-base64!!").unwrap_err();
    assert!(matches!(err, AppError::Decode(_)));
    assert_eq!(err.notice(), "Invalid sync code");

    assert_eq!(session.books(), before.as_slice());
    assert_eq!(backend.get(&StoreKeys::default().books).unwrap(), stored);
    assert!(session.last_sync().is_none());
}

#[test]
fn sync_between_two_devices() {
    let mut laptop = test_session();
    let mut phone = test_session();

    let phone_ids = upload(&mut phone, &["shared.pdf", "phone-only.epub"]);
    let laptop_ids = upload(&mut laptop, &["Shared.pdf", "laptop-only.pdf"]);

    let ticket = laptop.open(&laptop_ids[0]).unwrap();
    assert!(laptop.record_page(ticket.handle(), 5).unwrap());

    let summary = phone.import_code(&laptop.export_code().unwrap()).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.total, 3);

    let shared = phone.book(&phone_ids[0]).unwrap();
    assert_eq!(shared.page(), Some(5));
    assert_eq!(shared.filename, "Shared.pdf");
    assert!(phone.books().iter().any(|b| b.filename == "laptop-only.pdf"));
    assert_eq!(phone.books()[0].id, phone_ids[0]);
    assert!(phone.last_sync().is_some());
}

#[test]
fn importing_own_export_changes_nothing() {
    let mut session = test_session();
    upload(&mut session, &["a.pdf", "b.epub"]);
    let before = session.books().to_vec();

    let summary = session.import_code(&session.export_code().unwrap()).unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.updated, 2);

    let mut after = session.books().to_vec();
    let mut expected = before;
    after.sort_by(|a, b| a.id.cmp(&b.id));
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(after, expected);
}

#[test]
fn exported_code_round_trips() {
    let mut session = test_session();
    upload(&mut session, &["Ünïcødé 📚.epub", "a.pdf"]);

    let code = session.export_code().unwrap();
    let snapshot = sync::decode(&code).unwrap();
    assert_eq!(snapshot.format_version, sync::FORMAT_VERSION);
    assert_eq!(snapshot.books, session.books());
    assert_eq!(sync::decode(&sync::encode(&snapshot).unwrap()).unwrap(), snapshot);
}

#[test]
fn progress_requires_current_reader_and_matching_format() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf", "b.epub"]);

    let pdf = session.open(&ids[0]).unwrap();
    assert!(matches!(
        session.record_locator(pdf.handle(), "epubcfi(/6/2)"),
        Err(AppError::InvalidFormat(_))
    ));
    assert!(matches!(
        session.record_page(pdf.handle(), 0),
        Err(AppError::InvalidFormat(_))
    ));
    assert!(!session.record_page(pdf.handle(), 1).unwrap());

    let epub = session.open(&ids[1]).unwrap();
    assert!(!session.record_page(pdf.handle(), 3).unwrap());
    assert_eq!(session.book(&ids[0]).unwrap().page(), Some(1));
    assert!(session.record_locator(epub.handle(), "epubcfi(/6/4)").unwrap());
}

#[test]
fn progress_refreshes_updated_at() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let before = session.book(&ids[0]).unwrap().updated_at;

    let ticket = session.open(&ids[0]).unwrap();
    session.record_page(ticket.handle(), 2).unwrap();
    assert!(session.book(&ids[0]).unwrap().updated_at >= before);
}

async fn open_and_show<E: PdfEngine>(
    engine: &E,
    session: &mut LibrarySession,
    id: &str,
) -> Result<Option<PdfReader<E::Document>>> {
    let ticket = session.open(id)?;
    let loaded = reader::load_pdf(engine, ticket).await;
    let Some(mut pdf) = PdfReader::attach(session, loaded)? else {
        return Ok(None);
    };
    if let Err(e) = pdf.render().await {
        session.open_failed(pdf.handle(), &e);
        return Err(e);
    }
    pdf.commit(session)?;
    Ok(Some(pdf))
}

async fn turn<D: PdfDocument>(
    pdf: &mut PdfReader<D>,
    session: &mut LibrarySession,
    delta: i64,
) -> bool {
    let moved = pdf.turn(delta).await.unwrap();
    if moved {
        pdf.commit(session).unwrap();
    }
    moved
}

#[tokio::test]
async fn pdf_reader_restores_and_clamps_pages() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let engine = FakePdf::new(4);

    let mut pdf = open_and_show(&engine, &mut session, &ids[0]).await.unwrap().unwrap();
    assert_eq!(pdf.page(), 1);
    assert_eq!(pdf.pages(), 4);

    assert!(turn(&mut pdf, &mut session, 2).await);
    assert_eq!(session.book(&ids[0]).unwrap().page(), Some(3));

    assert!(turn(&mut pdf, &mut session, 10).await);
    assert_eq!(pdf.page(), 4);
    assert!(!turn(&mut pdf, &mut session, 1).await);

    assert!(turn(&mut pdf, &mut session, -100).await);
    assert_eq!(pdf.page(), 1);
    assert_eq!(*engine.rendered.borrow(), vec![1, 3, 4, 1]);

    // Reopen with a saved page past the end of a shorter document.
    pdf.go_to(4).await.unwrap();
    pdf.commit(&mut session).unwrap();
    let shorter = FakePdf::new(2);
    let pdf = open_and_show(&shorter, &mut session, &ids[0]).await.unwrap().unwrap();
    assert_eq!(pdf.page(), 2);
    assert_eq!(session.book(&ids[0]).unwrap().page(), Some(2));
}

struct GatedPdf {
    inner: FakePdf,
    gate: tokio::sync::Notify,
}

impl PdfEngine for GatedPdf {
    type Document = FakeDoc;

    async fn load(&self, content: &str) -> Result<FakeDoc> {
        self.gate.notified().await;
        self.inner.load(content).await
    }
}

#[tokio::test]
async fn switching_books_while_loading_discards_the_first() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf", "b.pdf"]);
    let engine = GatedPdf {
        inner: FakePdf::new(10),
        gate: tokio::sync::Notify::new(),
    };

    let first = session.open(&ids[0]).unwrap();
    let (loaded, second) = tokio::join!(reader::load_pdf(&engine, first), async {
        // The first load is parked on the gate while the user picks another book.
        let second = session.open(&ids[1]).unwrap();
        engine.gate.notify_one();
        second
    });

    assert!(PdfReader::attach(&mut session, loaded).unwrap().is_none());
    assert!(session.is_current(second.handle()));
    assert_eq!(session.active_book().unwrap().id, ids[1]);
    assert!(engine.inner.rendered.borrow().is_empty());
}

#[tokio::test]
async fn closing_while_loading_discards_the_open() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let engine = GatedPdf {
        inner: FakePdf::new(3),
        gate: tokio::sync::Notify::new(),
    };

    let ticket = session.open(&ids[0]).unwrap();
    let (loaded, ()) = tokio::join!(reader::load_pdf(&engine, ticket), async {
        session.close();
        engine.gate.notify_one();
    });

    assert!(PdfReader::attach(&mut session, loaded).unwrap().is_none());
    assert!(session.active_book().is_none());
}

#[tokio::test]
async fn closed_reader_stops_recording() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let engine = FakePdf::new(10);

    let mut pdf = open_and_show(&engine, &mut session, &ids[0]).await.unwrap().unwrap();
    session.close();

    assert!(pdf.turn(1).await.unwrap());
    assert!(!pdf.commit(&mut session).unwrap());
    assert_eq!(session.book(&ids[0]).unwrap().page(), Some(1));
}

#[tokio::test]
async fn failed_open_releases_the_book() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf"]);
    let mut engine = FakePdf::new(3);
    engine.fail = true;

    let result = open_and_show(&engine, &mut session, &ids[0]).await;
    assert!(matches!(result, Err(AppError::Reader(_))));
    assert!(session.active_book().is_none());

    engine.fail = false;
    assert!(open_and_show(&engine, &mut session, &ids[0]).await.unwrap().is_some());
}

#[tokio::test]
async fn epub_reader_records_locators() {
    let mut session = test_session();
    let ids = upload(&mut session, &["b.epub"]);
    let engine = FakeEpub::default();

    let ticket = session.open(&ids[0]).unwrap();
    let loaded = reader::display_epub(&engine, ticket).await;
    let mut epub: EpubReader<FakeRendition> =
        EpubReader::attach(&mut session, loaded).unwrap().unwrap();
    assert_eq!(*engine.started_at.borrow(), Some(None));

    epub.next();
    assert!(epub.relocated(&mut session, "epubcfi(/6/8)").unwrap());
    assert!(!epub.relocated(&mut session, "").unwrap());
    assert!(!epub.relocated(&mut session, "epubcfi(/6/8)").unwrap());
    assert_eq!(session.book(&ids[0]).unwrap().locator(), Some("epubcfi(/6/8)"));

    let ticket = session.open(&ids[0]).unwrap();
    let loaded = reader::display_epub(&engine, ticket).await;
    assert!(EpubReader::attach(&mut session, loaded).unwrap().is_some());
    assert_eq!(
        *engine.started_at.borrow(),
        Some(Some("epubcfi(/6/8)".to_string()))
    );

    // The first reader was superseded by the reopen.
    assert!(!epub.relocated(&mut session, "epubcfi(/6/10)").unwrap());
}

#[tokio::test]
async fn opening_with_the_wrong_engine_is_rejected() {
    let mut session = test_session();
    let ids = upload(&mut session, &["b.epub"]);

    let result = open_and_show(&FakePdf::new(1), &mut session, &ids[0]).await;
    assert!(matches!(result, Err(AppError::InvalidFormat(_))));
    assert!(session.active_book().is_none());
}

fn saved_page(store: &LocalStore) -> Option<u32> {
    store.load_books().first().and_then(Book::page)
}

fn save_page(store: &LocalStore, page: u32) {
    let mut book = Book::new("a.pdf", BookFormat::Pdf, b"", Utc::now());
    book.id = "a".to_string();
    book.progress = Progress::Pdf { page };
    store.save_books(&[book]).unwrap();
}

#[tokio::test]
async fn background_writer_applies_writes_in_order() {
    let backend = memory_backend();
    let mut store = LocalStore::new(Arc::clone(&backend), StoreKeys::default());
    assert!(store.spawn_writer());

    for page in 1..=20 {
        save_page(&store, page);
    }
    store.set_last_sync(Utc.timestamp_opt(1_700_000_000, 0).unwrap()).unwrap();

    store.stop_writer().await;
    assert!(!store.has_writer());

    assert_eq!(store.load_books().len(), 1);
    assert_eq!(saved_page(&store), Some(20));
    assert_eq!(store.last_sync(), Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
}

#[tokio::test]
async fn write_after_stopping_the_writer_lands_last() {
    let mut store = LocalStore::memory();
    store.spawn_writer();
    save_page(&store, 1);

    store.stop_writer().await;
    save_page(&store, 2);

    assert_eq!(saved_page(&store), Some(2));
}

#[tokio::test]
async fn second_spawn_keeps_the_running_writer() {
    let mut store = LocalStore::memory();
    assert!(store.spawn_writer());
    for page in 1..=10 {
        save_page(&store, page);
    }
    assert!(!store.spawn_writer());
    save_page(&store, 11);

    store.stop_writer().await;
    assert_eq!(saved_page(&store), Some(11));

    // Stopping twice is harmless.
    store.stop_writer().await;
}

#[test]
fn bare_extension_upload_survives_round_trip() {
    let backend = memory_backend();
    let mut session = session_on(&backend);
    let ids = upload(&mut session, &[".pdf", ".EPUB"]);

    assert!(session.books().iter().all(|b| b.title == "Untitled"));

    let snapshot = sync::decode(&session.export_code().unwrap()).unwrap();
    assert_eq!(snapshot.books, session.books());

    let reloaded = session_on(&backend);
    assert_eq!(reloaded.books(), session.books());
    assert_eq!(reloaded.book(&ids[0]).unwrap().title, "Untitled");
}

#[test]
fn empty_locator_keeps_saved_position() {
    let backend = memory_backend();
    let mut session = session_on(&backend);
    let ids = upload(&mut session, &["b.epub"]);

    let ticket = session.open(&ids[0]).unwrap();
    assert!(!session.record_locator(ticket.handle(), "").unwrap());
    assert_eq!(session.book(&ids[0]).unwrap().progress_label(), "Start");

    assert!(session.record_locator(ticket.handle(), "epubcfi(/6/2)").unwrap());
    assert!(!session.record_locator(ticket.handle(), "").unwrap());
    assert_eq!(session.book(&ids[0]).unwrap().locator(), Some("epubcfi(/6/2)"));

    let snapshot = sync::decode(&session.export_code().unwrap()).unwrap();
    assert_eq!(snapshot.books, session.books());
    assert_eq!(session_on(&backend).books(), session.books());
}

struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(AppError::Store("disk full".to_string()))
    }
}

#[test]
fn failed_save_still_notifies_and_reports() {
    let mut session = LibrarySession::new(
        LocalStore::new(Arc::new(BrokenStore), StoreKeys::default()),
        ReaderConfig::default(),
    );
    let seen = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&seen);
    session.subscribe(move |_: &LibraryChange, books: &[Book]| {
        *sink.borrow_mut() = books.len();
    });

    let err = session
        .upload([UploadedFile::new("a.pdf", b"x".to_vec())])
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(err.notice(), "Could not save your library");
    assert_eq!(*seen.borrow(), 1);
    assert_eq!(session.books().len(), 1);
}

#[test]
fn upload_does_not_open_a_book() {
    let mut session = test_session();
    let ids = upload(&mut session, &["a.pdf", "b.pdf"]);
    assert!(session.active_book().is_none());

    // Hosts that want the first upload selected open it themselves.
    session.open(&ids[0]).unwrap();
    assert_eq!(session.active_book().unwrap().title, "a");
}

#[test]
fn sqlite_store_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("reader.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.get("k").unwrap(), Some("second".to_string()));
    assert_eq!(store.get("missing").unwrap(), None);
}

#[test]
fn session_from_config_uses_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.path = dir.path().join("reader.db");

    let id = {
        let mut session = LibrarySession::from_config(&config).unwrap();
        upload(&mut session, &["a.pdf"]).remove(0)
    };

    let session = LibrarySession::from_config(&config).unwrap();
    assert!(session.book(&id).is_some());
}

#[test]
fn snapshot_of_sqlite_library_matches_memory() {
    let store = SqliteStore::open_memory().unwrap();
    let mut session = LibrarySession::new(
        LocalStore::new(Arc::new(store), StoreKeys::default()),
        ReaderConfig::default(),
    );
    upload(&mut session, &["a.pdf"]);

    let snapshot = Snapshot::new(session.books().to_vec(), Utc::now());
    let decoded = sync::decode(&sync::encode(&snapshot).unwrap()).unwrap();
    assert_eq!(decoded.books, session.books());
}

#[test]
fn config_parse_toml() {
    let toml = r#"
[store]
path = "/tmp/reader.db"
books_key = "books"

[reader]
pdf_scale = 2.0

[logging]
filter = "cloudsync_reader=debug"
"#;
    let config = Config::parse(toml).unwrap();
    assert_eq!(config.store.path, std::path::PathBuf::from("/tmp/reader.db"));
    assert_eq!(config.store.books_key, "books");
    assert_eq!(config.store.last_sync_key, "cloudsync-reader-last-sync");
    assert_eq!(config.reader.pdf_scale, 2.0);
    assert_eq!(config.logging.filter, "cloudsync_reader=debug");
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.store.books_key, "cloudsync-reader-mvp-books");
    assert_eq!(config.reader.pdf_scale, 1.25);

    let generated = Config::parse(&Config::generate_default()).unwrap();
    assert_eq!(generated.store.path, config.store.path);
    assert_eq!(generated.logging.filter, config.logging.filter);
}

#[test]
fn config_rejects_bad_toml() {
    assert!(matches!(Config::parse("[store"), Err(AppError::Config(_))));
}

#[test]
fn book_format_from_filename() {
    assert_eq!(BookFormat::from_filename("a.pdf"), Some(BookFormat::Pdf));
    assert_eq!(BookFormat::from_filename("A.EPUB"), Some(BookFormat::Epub));
    assert_eq!(BookFormat::from_filename("notes.txt"), None);
    assert_eq!(BookFormat::from_filename("pdf"), None);
    assert_eq!(BookFormat::Epub.mime_type(), "application/epub+zip");
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudsync-reader.toml");
    std::fs::write(&path, "[reader]\npdf_scale = 1.5\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.reader.pdf_scale, 1.5);
    assert_eq!(config.store.books_key, "cloudsync-reader-mvp-books");

    let missing = Config::load(&dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(AppError::Config(_))));
}

#[test]
fn logging_init_is_idempotent() {
    let config = Config::default();
    crate::logging::init(&config.logging.filter);
    crate::logging::init(&config.logging.filter);
    tracing::info!("logging initialized twice");
}
