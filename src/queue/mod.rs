// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供按优先级分发的任务队列
/// 包括进程内实现和基于数据库表的持久化实现
pub mod dispatch_queue;
pub mod postgres_queue;
