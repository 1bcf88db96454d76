// ==========================================
// 板件切割生产跟踪系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工序阶段 (Stage Code)
// ==========================================
// 红线: 阶段流转只允许走静态许可表,不允许任意跳转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageCode {
    New,            // 新建
    CutStart,       // 开料开始
    PalletOpen,     // 开托
    PalletPack,     // 装托
    PalletClose,    // 封托
    CutStop,        // 开料完成
    BufferSaw,      // 锯后缓存
    Transport,      // 转运
    BufferEdge,     // 封边缓存
    EdgeStart,      // 封边开始
    EdgeStop,       // 封边完成
    BufferDrill,    // 钻孔缓存
    DrillStart,     // 钻孔开始
    DrillStop,      // 钻孔完成
    BufferAssembly, // 组装缓存
    AssemblyStart,  // 组装开始
    AssemblyStop,   // 组装完成
    BufferPack,     // 打包缓存
    PackStart,      // 打包开始
    PackStop,       // 打包完成
    BufferShip,     // 待发运
    Ship,           // 已发运
    Completed,      // 已完成(终态)
    Cancelled,      // 已取消(终态)
}

impl StageCode {
    /// 从字符串解析阶段代码（大小写不敏感，统一按大写归一化）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Some(StageCode::New),
            "CUT_START" => Some(StageCode::CutStart),
            "PALLET_OPEN" => Some(StageCode::PalletOpen),
            "PALLET_PACK" => Some(StageCode::PalletPack),
            "PALLET_CLOSE" => Some(StageCode::PalletClose),
            "CUT_STOP" => Some(StageCode::CutStop),
            "BUFFER_SAW" => Some(StageCode::BufferSaw),
            "TRANSPORT" => Some(StageCode::Transport),
            "BUFFER_EDGE" => Some(StageCode::BufferEdge),
            "EDGE_START" => Some(StageCode::EdgeStart),
            "EDGE_STOP" => Some(StageCode::EdgeStop),
            "BUFFER_DRILL" => Some(StageCode::BufferDrill),
            "DRILL_START" => Some(StageCode::DrillStart),
            "DRILL_STOP" => Some(StageCode::DrillStop),
            "BUFFER_ASSEMBLY" => Some(StageCode::BufferAssembly),
            "ASSEMBLY_START" => Some(StageCode::AssemblyStart),
            "ASSEMBLY_STOP" => Some(StageCode::AssemblyStop),
            "BUFFER_PACK" => Some(StageCode::BufferPack),
            "PACK_START" => Some(StageCode::PackStart),
            "PACK_STOP" => Some(StageCode::PackStop),
            "BUFFER_SHIP" => Some(StageCode::BufferShip),
            "SHIP" => Some(StageCode::Ship),
            "COMPLETED" => Some(StageCode::Completed),
            "CANCELLED" => Some(StageCode::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StageCode::New => "NEW",
            StageCode::CutStart => "CUT_START",
            StageCode::PalletOpen => "PALLET_OPEN",
            StageCode::PalletPack => "PALLET_PACK",
            StageCode::PalletClose => "PALLET_CLOSE",
            StageCode::CutStop => "CUT_STOP",
            StageCode::BufferSaw => "BUFFER_SAW",
            StageCode::Transport => "TRANSPORT",
            StageCode::BufferEdge => "BUFFER_EDGE",
            StageCode::EdgeStart => "EDGE_START",
            StageCode::EdgeStop => "EDGE_STOP",
            StageCode::BufferDrill => "BUFFER_DRILL",
            StageCode::DrillStart => "DRILL_START",
            StageCode::DrillStop => "DRILL_STOP",
            StageCode::BufferAssembly => "BUFFER_ASSEMBLY",
            StageCode::AssemblyStart => "ASSEMBLY_START",
            StageCode::AssemblyStop => "ASSEMBLY_STOP",
            StageCode::BufferPack => "BUFFER_PACK",
            StageCode::PackStart => "PACK_START",
            StageCode::PackStop => "PACK_STOP",
            StageCode::BufferShip => "BUFFER_SHIP",
            StageCode::Ship => "SHIP",
            StageCode::Completed => "COMPLETED",
            StageCode::Cancelled => "CANCELLED",
        }
    }

    /// 阶段中文名称
    pub fn label_cn(&self) -> &'static str {
        match self {
            StageCode::New => "新建",
            StageCode::CutStart => "开料开始",
            StageCode::PalletOpen => "开托",
            StageCode::PalletPack => "装托",
            StageCode::PalletClose => "封托",
            StageCode::CutStop => "开料完成",
            StageCode::BufferSaw => "锯后缓存",
            StageCode::Transport => "转运",
            StageCode::BufferEdge => "封边缓存",
            StageCode::EdgeStart => "封边开始",
            StageCode::EdgeStop => "封边完成",
            StageCode::BufferDrill => "钻孔缓存",
            StageCode::DrillStart => "钻孔开始",
            StageCode::DrillStop => "钻孔完成",
            StageCode::BufferAssembly => "组装缓存",
            StageCode::AssemblyStart => "组装开始",
            StageCode::AssemblyStop => "组装完成",
            StageCode::BufferPack => "打包缓存",
            StageCode::PackStart => "打包开始",
            StageCode::PackStop => "打包完成",
            StageCode::BufferShip => "待发运",
            StageCode::Ship => "已发运",
            StageCode::Completed => "已完成",
            StageCode::Cancelled => "已取消",
        }
    }

    /// 判断是否为终态（COMPLETED / CANCELLED 不再允许任何流转）
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageCode::Completed | StageCode::Cancelled)
    }
}

impl fmt::Display for StageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 托盘状态 (Pallet Status)
// ==========================================
// 生命周期: DRAFT → OPEN → CLOSED → IN_TRANSIT → DELIVERED
// 红线: CLOSED 及之后的托盘不可再修改装载明细
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalletStatus {
    Draft,     // 草稿(试算结果,未入库)
    Open,      // 打开(可装托)
    Closed,    // 封闭(明细冻结)
    InTransit, // 转运中
    Delivered, // 已送达
}

impl PalletStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(PalletStatus::Draft),
            "OPEN" => Some(PalletStatus::Open),
            "CLOSED" => Some(PalletStatus::Closed),
            "IN_TRANSIT" => Some(PalletStatus::InTransit),
            "DELIVERED" => Some(PalletStatus::Delivered),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PalletStatus::Draft => "DRAFT",
            PalletStatus::Open => "OPEN",
            PalletStatus::Closed => "CLOSED",
            PalletStatus::InTransit => "IN_TRANSIT",
            PalletStatus::Delivered => "DELIVERED",
        }
    }

    /// 判断装载明细是否可修改
    pub fn is_mutable(&self) -> bool {
        matches!(self, PalletStatus::Draft | PalletStatus::Open)
    }
}

impl fmt::Display for PalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 托盘目的地 (Pallet Destination)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalletDestination {
    Warehouse, // 仓库
    Edger,     // 封边机
    Driller,   // 钻孔机
    Cutter,    // 裁切区
    Shipping,  // 发运区
}

impl PalletDestination {
    /// 从字符串解析目的地
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "WAREHOUSE" => Some(PalletDestination::Warehouse),
            "EDGER" => Some(PalletDestination::Edger),
            "DRILLER" => Some(PalletDestination::Driller),
            "CUTTER" => Some(PalletDestination::Cutter),
            "SHIPPING" => Some(PalletDestination::Shipping),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PalletDestination::Warehouse => "WAREHOUSE",
            PalletDestination::Edger => "EDGER",
            PalletDestination::Driller => "DRILLER",
            PalletDestination::Cutter => "CUTTER",
            PalletDestination::Shipping => "SHIPPING",
        }
    }
}

impl fmt::Display for PalletDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 堆叠模型 (Stacking Model)
// ==========================================
// 托盘高度计算口径,必须显式指定,不允许隐式假设:
// - LAYERED: 按层堆叠, height = Σ ceil(qty / per_layer) × thickness
// - FLAT:    平铺单层, height = Σ qty × thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackingModel {
    Layered, // 分层堆叠
    Flat,    // 逐件平铺
}

impl StackingModel {
    /// 从字符串解析堆叠模型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LAYERED" => Some(StackingModel::Layered),
            "FLAT" => Some(StackingModel::Flat),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StackingModel::Layered => "LAYERED",
            StackingModel::Flat => "FLAT",
        }
    }
}

impl Default for StackingModel {
    fn default() -> Self {
        StackingModel::Layered
    }
}

impl fmt::Display for StackingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 守卫级别 (Guard Severity)
// ==========================================
// 硬守卫失败直接阻断;软守卫失败需 force=true 才放行
// 级别属于配置而非代码,允许按现场运维要求覆写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardSeverity {
    Hard, // 硬阻断
    Soft, // 软警告
}

impl GuardSeverity {
    /// 从字符串解析守卫级别
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HARD" => Some(GuardSeverity::Hard),
            "SOFT" => Some(GuardSeverity::Soft),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            GuardSeverity::Hard => "HARD",
            GuardSeverity::Soft => "SOFT",
        }
    }
}

impl fmt::Display for GuardSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
