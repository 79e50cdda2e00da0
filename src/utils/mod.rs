// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括错误分类、glob匹配、超时控制、输入校验和遥测初始化
pub mod errors;
pub mod glob;
pub mod telemetry;
pub mod timeout;
pub mod validators;
