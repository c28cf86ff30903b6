/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - canvas: CanvasConfig, gatekeeper: Gatekeeper, graph: GraphClient
 *   - limits: canvas gate が body を読むときの上限
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエスト単位の状態 (CanvasUser) は request extensions に載せ、ここには置かない
 */
use std::sync::Arc;

use crate::config::{CanvasConfig, HttpLimits};
use crate::services::canvas::Gatekeeper;
use crate::services::graph::GraphClient;

#[derive(Clone, Debug)]
pub struct AppState {
    pub canvas: Arc<CanvasConfig>,
    pub gatekeeper: Arc<Gatekeeper>,
    pub graph: GraphClient,
    pub limits: HttpLimits,
}

impl AppState {
    pub fn new(
        canvas: Arc<CanvasConfig>,
        gatekeeper: Arc<Gatekeeper>,
        graph: GraphClient,
        limits: HttpLimits,
    ) -> Self {
        Self {
            canvas,
            gatekeeper,
            graph,
            limits,
        }
    }
}
