// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，提供对具体技术的抽象和封装。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis与进程内计数器后端、搜索结果与任务状态缓存
/// - 数据库（database）：数据库连接和实体映射
/// - 指标（metrics）：Prometheus 指标导出
/// - 仓库实现（repositories）：任务仓库的SeaORM实现
/// - 搜索（search）：Elasticsearch 索引适配器
///
/// 基础设施层遵循依赖倒置原则，依赖于领域层的抽象接口。
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
pub mod search;
