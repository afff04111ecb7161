//! 任务 API

use crate::error::Result;
use crate::models::{TaskRecord, TaskStatusType};
use crate::reference::classes::{Task, TaskRef};
use crate::session::Session;

/// 任务 API
pub struct TaskApi<'a> {
    session: &'a Session,
}

common_api!(TaskApi, Task, TaskRecord);

impl<'a> TaskApi<'a> {
    pub async fn get_by_name_label(&self, label: &str) -> Result<Vec<TaskRef>> {
        self.session
            .rpc("task.get_by_name_label")
            .arg("label", label)?
            .call()
            .await
    }

    pub async fn get_status(&self, task: &TaskRef) -> Result<TaskStatusType> {
        self.session.rpc("task.get_status").arg("self", task)?.call().await
    }

    /// 读取进度（0.0 - 1.0）
    pub async fn get_progress(&self, task: &TaskRef) -> Result<f64> {
        self.session.rpc("task.get_progress").arg("self", task)?.call().await
    }

    /// 读取原始结果字段
    pub async fn get_result(&self, task: &TaskRef) -> Result<String> {
        self.session.rpc("task.get_result").arg("self", task)?.call().await
    }

    /// 请求取消任务；服务端可能不会立即停止
    pub async fn cancel(&self, task: &TaskRef) -> Result<()> {
        self.session.rpc("task.cancel").arg("task", task)?.call().await
    }

    pub async fn destroy(&self, task: &TaskRef) -> Result<()> {
        self.session.rpc("task.destroy").arg("self", task)?.call().await
    }
}
