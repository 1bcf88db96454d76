// ==========================================
// 板件切割生产跟踪系统 - 工序流转许可表
// ==========================================
// 职责: 维护"阶段 → 允许的后继阶段"静态有向图
// 生命周期: load → freeze → serve
// 红线: 许可表一经装配即不可变;环境覆写只能装配新表,不允许原地修改
// ==========================================
// 许可表可由外部策略源下发;策略源不可达时回退到内置表,
// 两者按大写归一化的阶段代码对齐,行为完全一致。
// ==========================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::StageCode;
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// StageGraph - 冻结后的许可表
// ==========================================
#[derive(Debug, Clone)]
pub struct StageGraph {
    successors: HashMap<StageCode, Vec<StageCode>>,
}

impl StageGraph {
    /// 内置许可表
    ///
    /// 分支点:
    /// - PALLET_CLOSE 之后可再开托(多托盘)或结束开料
    /// - BUFFER_SAW 可直接转运或就地进入封边缓存
    /// - 各缓存阶段允许跳过其后的可选工序(免封边/免钻孔/免组装)
    pub fn bundled() -> Self {
        use StageCode::*;

        let table: &[(StageCode, &[StageCode])] = &[
            (New, &[CutStart, Cancelled]),
            (CutStart, &[PalletOpen, CutStop]),
            (PalletOpen, &[PalletPack]),
            (PalletPack, &[PalletClose]),
            (PalletClose, &[PalletOpen, CutStop]),
            (CutStop, &[BufferSaw]),
            (BufferSaw, &[Transport, BufferEdge]),
            (Transport, &[BufferEdge]),
            (BufferEdge, &[EdgeStart, BufferDrill]),
            (EdgeStart, &[EdgeStop]),
            (EdgeStop, &[BufferDrill]),
            (BufferDrill, &[DrillStart, BufferAssembly]),
            (DrillStart, &[DrillStop]),
            (DrillStop, &[BufferAssembly]),
            (BufferAssembly, &[AssemblyStart, BufferPack]),
            (AssemblyStart, &[AssemblyStop]),
            (AssemblyStop, &[BufferPack]),
            (BufferPack, &[PackStart]),
            (PackStart, &[PackStop]),
            (PackStop, &[BufferShip]),
            (BufferShip, &[Ship]),
            (Ship, &[Completed]),
            (Completed, &[]),
            (Cancelled, &[]),
        ];

        let successors = table
            .iter()
            .map(|(from, to)| (*from, to.to_vec()))
            .collect();

        Self { successors }
    }

    /// 从外部策略源的原始表装配许可表
    ///
    /// 阶段代码按大写归一化;未知代码视为表损坏,整表拒绝。
    pub fn from_raw_table(raw: &[(String, Vec<String>)]) -> EngineResult<Self> {
        let mut successors: HashMap<StageCode, Vec<StageCode>> = HashMap::new();

        for (from_raw, to_raws) in raw {
            let from = StageCode::from_str(from_raw).ok_or_else(|| {
                EngineError::Validation(format!("许可表包含未知阶段代码: {}", from_raw))
            })?;

            let mut targets = Vec::with_capacity(to_raws.len());
            for to_raw in to_raws {
                let to = StageCode::from_str(to_raw).ok_or_else(|| {
                    EngineError::Validation(format!("许可表包含未知阶段代码: {}", to_raw))
                })?;
                targets.push(to);
            }

            successors.insert(from, targets);
        }

        Ok(Self { successors })
    }

    /// 某阶段允许的后继阶段
    pub fn allowed_next(&self, stage: StageCode) -> &[StageCode] {
        self.successors
            .get(&stage)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 判断一次流转是否在许可表内
    pub fn is_allowed(&self, from: StageCode, to: StageCode) -> bool {
        self.allowed_next(from).contains(&to)
    }
}

// ==========================================
// StagePolicySource - 外部策略源
// ==========================================
// 网络型协作方,唯一的幂等读;失败只触发回退,不影响其他持久化
#[async_trait]
pub trait StagePolicySource: Send + Sync {
    /// 拉取许可表原始数据: (阶段代码, 允许的后继阶段代码列表)
    async fn fetch_transition_table(&self) -> EngineResult<Vec<(String, Vec<String>)>>;
}

// ==========================================
// StageGraphLoader - 许可表装载器
// ==========================================
pub struct StageGraphLoader {
    source: Option<Arc<dyn StagePolicySource>>,
    timeout: Duration,
}

impl StageGraphLoader {
    /// 仅使用内置表的装载器
    pub fn bundled_only() -> Self {
        Self {
            source: None,
            timeout: Duration::from_millis(0),
        }
    }

    /// 使用外部策略源的装载器
    pub fn with_source(source: Arc<dyn StagePolicySource>, timeout: Duration) -> Self {
        Self {
            source: Some(source),
            timeout,
        }
    }

    /// 装载并冻结许可表
    ///
    /// # 规则
    /// - 无策略源 → 直接使用内置表
    /// - 有策略源 → 限时拉取,失败重试一次,仍失败则告警并回退内置表
    pub async fn load(&self) -> Arc<StageGraph> {
        let source = match &self.source {
            Some(s) => s,
            None => return Arc::new(StageGraph::bundled()),
        };

        for attempt in 1..=2 {
            match tokio::time::timeout(self.timeout, source.fetch_transition_table()).await {
                Ok(Ok(raw)) => match StageGraph::from_raw_table(&raw) {
                    Ok(graph) => {
                        tracing::info!("工序许可表已从外部策略源装载 (attempt={})", attempt);
                        return Arc::new(graph);
                    }
                    Err(e) => {
                        tracing::warn!("外部许可表装配失败, 回退内置表: {}", e);
                        return Arc::new(StageGraph::bundled());
                    }
                },
                Ok(Err(e)) => {
                    tracing::warn!("外部策略源拉取失败 (attempt={}): {}", attempt, e);
                }
                Err(_) => {
                    tracing::warn!(
                        "外部策略源拉取超时 (attempt={}, timeout={:?})",
                        attempt,
                        self.timeout
                    );
                }
            }
        }

        tracing::warn!("外部策略源不可达, 使用内置工序许可表");
        Arc::new(StageGraph::bundled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_graph_basic_transitions() {
        let graph = StageGraph::bundled();

        assert!(graph.is_allowed(StageCode::New, StageCode::CutStart));
        assert!(graph.is_allowed(StageCode::New, StageCode::Cancelled));
        assert!(!graph.is_allowed(StageCode::New, StageCode::Ship));

        // 自环不在许可表内
        assert!(!graph.is_allowed(StageCode::New, StageCode::New));
        assert!(!graph.is_allowed(StageCode::CutStart, StageCode::CutStart));
    }

    #[test]
    fn test_bundled_graph_branch_points() {
        let graph = StageGraph::bundled();

        // 缓存阶段允许跳过可选工序
        assert!(graph.is_allowed(StageCode::BufferEdge, StageCode::EdgeStart));
        assert!(graph.is_allowed(StageCode::BufferEdge, StageCode::BufferDrill));
        assert!(graph.is_allowed(StageCode::BufferDrill, StageCode::BufferAssembly));
        assert!(graph.is_allowed(StageCode::BufferAssembly, StageCode::BufferPack));
    }

    #[test]
    fn test_terminal_stages_have_no_successors() {
        let graph = StageGraph::bundled();
        assert!(graph.allowed_next(StageCode::Completed).is_empty());
        assert!(graph.allowed_next(StageCode::Cancelled).is_empty());
    }

    #[test]
    fn test_cancelled_only_reachable_from_new() {
        let graph = StageGraph::bundled();
        use StageCode::*;

        for stage in [
            CutStart, PalletOpen, PalletPack, PalletClose, CutStop, BufferSaw, Transport,
            BufferEdge, EdgeStart, EdgeStop, BufferDrill, DrillStart, DrillStop, BufferAssembly,
            AssemblyStart, AssemblyStop, BufferPack, PackStart, PackStop, BufferShip, Ship,
        ] {
            assert!(
                !graph.is_allowed(stage, Cancelled),
                "{} 不应允许直接取消",
                stage
            );
        }
        assert!(graph.is_allowed(New, Cancelled));
    }

    #[test]
    fn test_from_raw_table_normalizes_case() {
        let raw = vec![
            ("new".to_string(), vec!["cut_start".to_string(), "CANCELLED".to_string()]),
            ("Cut_Start".to_string(), vec!["pallet_open".to_string()]),
        ];
        let graph = StageGraph::from_raw_table(&raw).unwrap();

        assert!(graph.is_allowed(StageCode::New, StageCode::CutStart));
        assert!(graph.is_allowed(StageCode::CutStart, StageCode::PalletOpen));
    }

    #[test]
    fn test_from_raw_table_rejects_unknown_codes() {
        let raw = vec![("NEW".to_string(), vec!["WARP_DRIVE".to_string()])];
        assert!(matches!(
            StageGraph::from_raw_table(&raw),
            Err(EngineError::Validation(_))
        ));
    }
}
