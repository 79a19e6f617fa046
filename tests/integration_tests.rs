//! End-to-end tests for Oracle's indexing and retrieval pipeline.

use std::path::Path;
use std::sync::Arc;

use oracle::{
    ChunkStore, EmbeddingService, FileSystemRepositoryWalker, IndexRepositoryUseCase, Language,
    LexicalIndex, MockEmbedding, ParserService, PassthroughReranking, SearchCodeUseCase,
    SearchParams, SqliteChunkStore, SymbolType, TantivyLexicalIndex, TreeSitterParser,
    UsearchVectorIndex, VectorIndex,
};

struct TestEnv {
    chunk_store: Arc<SqliteChunkStore>,
    lexical_index: Arc<TantivyLexicalIndex>,
    vector_index: Arc<UsearchVectorIndex>,
    embedding_service: Arc<MockEmbedding>,
    _lexical_dir: tempfile::TempDir,
    _vector_dir: tempfile::TempDir,
}

fn setup_test_env() -> TestEnv {
    let lexical_dir = tempfile::tempdir().unwrap();
    let vector_dir = tempfile::tempdir().unwrap();

    TestEnv {
        chunk_store: Arc::new(SqliteChunkStore::in_memory().expect("open chunk store")),
        lexical_index: Arc::new(
            TantivyLexicalIndex::open(lexical_dir.path()).expect("open lexical index"),
        ),
        vector_index: Arc::new(
            UsearchVectorIndex::open(vector_dir.path().join("vectors.usearch"))
                .expect("open vector index"),
        ),
        embedding_service: Arc::new(MockEmbedding::with_dimensions(384)),
        _lexical_dir: lexical_dir,
        _vector_dir: vector_dir,
    }
}

fn index_use_case(env: &TestEnv) -> IndexRepositoryUseCase {
    IndexRepositoryUseCase::new(
        env.chunk_store.clone(),
        env.lexical_index.clone(),
        env.vector_index.clone(),
        Arc::new(TreeSitterParser::new()),
        env.embedding_service.clone(),
        Arc::new(FileSystemRepositoryWalker::new()),
    )
}

fn search_use_case(env: &TestEnv) -> SearchCodeUseCase {
    SearchCodeUseCase::new(
        env.chunk_store.clone(),
        env.lexical_index.clone(),
        env.vector_index.clone(),
        env.embedding_service.clone(),
        Arc::new(PassthroughReranking::new()),
    )
}

fn write_fixture(dir: &Path) {
    std::fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_rust.rs"),
        dir.join("sample.rs"),
    )
    .unwrap();
}

#[tokio::test]
async fn full_index_then_search_finds_a_known_function() {
    let env = setup_test_env();
    let repo = tempfile::tempdir().unwrap();
    write_fixture(repo.path());

    let use_case = index_use_case(&env);
    let stats = use_case.full_index(repo.path(), None).await.expect("full index");

    assert_eq!(stats.files_failed, 0);
    assert!(stats.chunks_created > 0);
    assert_eq!(env.chunk_store.count().await.unwrap(), stats.chunks_created);
    assert_eq!(env.lexical_index.count().await.unwrap(), stats.chunks_created);
    assert_eq!(env.vector_index.count().await.unwrap(), stats.chunks_created);

    let search = search_use_case(&env);
    let results = search
        .hybrid_search("display_name", SearchParams::default())
        .await
        .expect("hybrid search");

    assert!(!results.is_empty());
    assert!(results.iter().any(|r| r.symbol_name() == "display_name"));
}

#[tokio::test]
async fn full_index_run_twice_does_not_duplicate_chunks() {
    let env = setup_test_env();
    let repo = tempfile::tempdir().unwrap();
    write_fixture(repo.path());

    let use_case = index_use_case(&env);
    let first = use_case.full_index(repo.path(), None).await.expect("full index");
    let second = use_case.full_index(repo.path(), None).await.expect("full index");

    assert_eq!(first.chunks_created, second.chunks_created);
    assert_eq!(env.chunk_store.count().await.unwrap(), second.chunks_created);
    assert_eq!(env.lexical_index.count().await.unwrap(), second.chunks_created);
    assert_eq!(env.vector_index.count().await.unwrap(), second.chunks_created);
}

#[tokio::test]
async fn hybrid_search_on_an_empty_query_skips_retrieval_entirely() {
    let env = setup_test_env();
    let repo = tempfile::tempdir().unwrap();
    write_fixture(repo.path());

    let use_case = index_use_case(&env);
    use_case.full_index(repo.path(), None).await.expect("full index");

    let search = search_use_case(&env);
    let results = search
        .hybrid_search("   ", SearchParams::default())
        .await
        .expect("hybrid search");
    assert!(results.is_empty());
}

#[tokio::test]
async fn update_index_reindexes_a_modified_file_and_drops_deleted_ones() {
    let env = setup_test_env();
    let repo = tempfile::tempdir().unwrap();
    write_fixture(repo.path());

    let use_case = index_use_case(&env);
    let first = use_case.full_index(repo.path(), None).await.expect("full index");
    assert!(first.chunks_created > 0);

    // Modify the file: add a new function.
    let mut content = std::fs::read_to_string(repo.path().join("sample.rs")).unwrap();
    content.push_str("\npub fn subtract(a: i32, b: i32) -> i32 { a - b }\n");
    std::fs::write(repo.path().join("sample.rs"), content).unwrap();

    let second = use_case.update_index(repo.path(), None).await.expect("update index");
    assert_eq!(second.files_failed, 0);
    assert!(second.chunks_created > 0, "the modified file should be reindexed");

    let search = search_use_case(&env);
    let results = search
        .hybrid_search("subtract", SearchParams::default())
        .await
        .expect("hybrid search");
    assert!(results.iter().any(|r| r.symbol_name() == "subtract"));

    // Delete the file entirely; update_index should drop its chunks.
    std::fs::remove_file(repo.path().join("sample.rs")).unwrap();
    let third = use_case.update_index(repo.path(), None).await.expect("update index");
    assert_eq!(third.files_discovered, 0);
    assert_eq!(env.chunk_store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn parser_extracts_rust_functions() {
    let parser = TreeSitterParser::new();
    let code = "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\nfn multiply(x: f64, y: f64) -> f64 {\n    x * y\n}\n";

    let chunks = parser.parse_file(code, "math.rs", Language::Rust).await.expect("parse");
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.symbol_type() == SymbolType::Function));
}

#[tokio::test]
async fn parser_extracts_python_classes_and_nested_methods() {
    let parser = TreeSitterParser::new();
    let code = "class Calculator:\n    def __init__(self):\n        self.value = 0\n\n    def add(self, x):\n        self.value += x\n        return self\n\nclass StringHelper:\n    def reverse(self, s):\n        return s[::-1]\n";

    let chunks = parser.parse_file(code, "helpers.py", Language::Python).await.expect("parse");

    let classes: Vec<_> = chunks.iter().filter(|c| c.symbol_type() == SymbolType::Class).collect();
    assert_eq!(classes.len(), 2);

    let methods: Vec<_> = chunks.iter().filter(|c| c.symbol_type() == SymbolType::Method).collect();
    assert!(!methods.is_empty(), "methods nested in a class should be tagged Method, not Function");
}

#[test]
fn language_detection_maps_extensions_to_registered_grammars() {
    assert_eq!(Language::from_path(Path::new("main.rs")), Language::Rust);
    assert_eq!(Language::from_path(Path::new("app.py")), Language::Python);
    assert_eq!(Language::from_path(Path::new("index.js")), Language::JavaScript);
    assert_eq!(Language::from_path(Path::new("app.tsx")), Language::TypeScript);
    assert_eq!(Language::from_path(Path::new("main.go")), Language::Go);
    assert_eq!(Language::from_path(Path::new("script.php")), Language::Php);
    assert_eq!(Language::from_path(Path::new("readme.md")), Language::Unknown);
}

#[tokio::test]
async fn embedding_service_produces_vectors_matching_its_configured_dimensionality() {
    let service = MockEmbedding::with_dimensions(384);
    let vector = service.embed_query("fn main() {}").await.expect("embed");
    assert_eq!(vector.len(), 384);
    assert_eq!(service.dimensions(), 384);
}
