// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 提供计数器后端的Redis与进程内实现，以及搜索结果和任务状态缓存
pub mod cache_manager;
pub mod memory_backend;
pub mod redis_client;
