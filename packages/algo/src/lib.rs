//! # masterly-algo - 自适应练习核心算法库
//!
//! 本 crate 提供纯 Rust 实现的掌握度估计与出题策略:
//!
//! - **Bayesian Knowledge Tracing** - 基于作答正误的掌握度贝叶斯更新
//! - **Mastery-Banded Selection** - 按掌握度分档选择题目难度，避免重复
//! - **Adaptive Session** - 作答 / 评分 / 选题 / 完成 状态机
//! - **Recalibration** - 基于近期作答日志的参数重估
//!
//! ## 设计理念
//!
//! - **纯函数** - 无 I/O，无全局状态，状态显式传入并返回
//! - **可注入随机源** - 选题的平局打破策略可替换，便于复现测试
//! - **参数校验** - 非法参数在构造时拒绝，而不是静默截断
//!
//! ## 模块结构
//!
//! - [`types`] - 公共类型和常量
//! - [`error`] - 错误类型
//! - [`sanitize`] - 概率校验与数值漂移处理
//! - [`estimator`] - BKT 更新
//! - [`selection`] - 选题策略
//! - [`session`] - 练习会话状态机
//! - [`calibration`] - 参数重估
//! - [`recommend`] - 学习建议
//!
//! ## 使用示例
//!
//! ```rust
//! use masterly_algo::{estimator, BktParameters};
//!
//! let params = BktParameters::new(0.1, 0.3, 0.25, 0.1).unwrap();
//! let mastery = estimator::update(params.prior_knowledge(), true, &params).unwrap();
//! assert!((mastery - 0.5).abs() < 1e-9);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod calibration;
pub mod error;
pub mod estimator;
pub mod recommend;
pub mod sanitize;
pub mod selection;
pub mod session;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

/// 重新导出错误类型
pub use error::{BktError, BktResult, SessionError};

/// 重新导出选题策略
pub use selection::{
    select_next, DifficultyBands, LowestIdTieBreaker, RandomTieBreaker, TieBreaker,
};

/// 重新导出会话状态机
pub use session::{
    decide_next, AdaptiveSession, CompletionReason, NextStep, SessionConfig, SessionPhase,
    StepOutcome,
};

/// 重新导出参数重估
pub use calibration::{
    replay_accuracy, AccuracyHeuristic, AttemptObservation, CalibrationOutcome,
    CalibrationReport, RateBounds, Recalibrator, DEFAULT_MIN_SAMPLES,
};

/// 重新导出学习建议
pub use recommend::{recommend, Priority, Recommendation};
