/*
 * Responsibility
 * - ドメインロジック (signed_request 検証 / 認可判定 / Graph API 呼び出し)
 * - axum には依存しない (middleware 側から呼ぶ)
 */
pub mod canvas;
pub mod graph;
