// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 调用方身份（caller）：认证结果与限流上限
/// - 爬取任务（job）：任务状态机、SLA与终态结果
/// - 搜索（search）：查询约束、规范化和搜索响应
pub mod caller;
pub mod job;
pub mod search;
