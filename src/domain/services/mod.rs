// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务，所有请求和后台任务在访问
/// 存储或索引之前都会经过这些服务。
///
/// 包含的服务：
/// - 任务服务（job_service）：任务提交、状态机和状态查询
/// - 限流服务（rate_limiting_service）：基于固定窗口计数的准入控制
/// - 搜索服务（search_service）：旁路缓存的搜索查询路径
pub mod job_service;
pub mod rate_limiting_service;
pub mod search_service;
