// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 计数器后端（counter_backend）：原子计数与带过期时间的键值存储
/// - 任务仓库（job_repository）：任务的持久化与条件状态更新
pub mod counter_backend;
pub mod job_repository;
