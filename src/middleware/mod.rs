/*
 * Responsibility
 * - middleware の公開インターフェース
 * - canvas (signed_request gate), http (request-id/limit/timeout/trace), security_headers
 */
pub mod canvas;
pub mod http;
pub mod security_headers;
