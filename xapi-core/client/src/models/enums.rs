//! 服务端枚举

use crate::codec::xapi_enum;

xapi_enum! {
    /// 虚拟机电源状态
    pub enum VmPowerState {
        Halted => "Halted",
        Paused => "Paused",
        Running => "Running",
        Suspended => "Suspended",
    }
}

xapi_enum! {
    /// 虚拟机操作
    pub enum VmOperations {
        Snapshot => "snapshot",
        Clone => "clone",
        Copy => "copy",
        CreateTemplate => "create_template",
        Revert => "revert",
        Checkpoint => "checkpoint",
        SnapshotWithQuiesce => "snapshot_with_quiesce",
        Provision => "provision",
        Start => "start",
        StartOn => "start_on",
        Pause => "pause",
        Unpause => "unpause",
        CleanShutdown => "clean_shutdown",
        CleanReboot => "clean_reboot",
        HardShutdown => "hard_shutdown",
        PowerStateReset => "power_state_reset",
        HardReboot => "hard_reboot",
        Suspend => "suspend",
        Csvm => "csvm",
        Resume => "resume",
        ResumeOn => "resume_on",
        PoolMigrate => "pool_migrate",
        MigrateSend => "migrate_send",
        GetBootRecord => "get_boot_record",
        SendSysrq => "send_sysrq",
        SendTrigger => "send_trigger",
        QueryServices => "query_services",
        Shutdown => "shutdown",
        CallPlugin => "call_plugin",
        ChangingMemoryLive => "changing_memory_live",
        AwaitingMemoryLive => "awaiting_memory_live",
        ChangingDynamicRange => "changing_dynamic_range",
        ChangingStaticRange => "changing_static_range",
        ChangingMemoryLimits => "changing_memory_limits",
        ChangingShadowMemory => "changing_shadow_memory",
        ChangingShadowMemoryLive => "changing_shadow_memory_live",
        ChangingVcpus => "changing_VCPUs",
        ChangingVcpusLive => "changing_VCPUs_live",
        ChangingNvram => "changing_NVRAM",
        AssertOperationValid => "assert_operation_valid",
        DataSourceOp => "data_source_op",
        UpdateAllowedOperations => "update_allowed_operations",
        MakeIntoTemplate => "make_into_template",
        Import => "import",
        Export => "export",
        MetadataExport => "metadata_export",
        Reverting => "reverting",
        Destroy => "destroy",
        CreateVtpm => "create_vtpm",
    }
}

xapi_enum! {
    /// 主机操作
    pub enum HostAllowedOperations {
        Provision => "provision",
        Evacuate => "evacuate",
        Shutdown => "shutdown",
        Reboot => "reboot",
        PowerOn => "power_on",
        VmStart => "vm_start",
        VmResume => "vm_resume",
        VmMigrate => "vm_migrate",
        ApplyUpdates => "apply_updates",
        Enable => "enable",
    }
}

xapi_enum! {
    /// 虚拟磁盘类型
    pub enum VdiType {
        System => "system",
        User => "user",
        Ephemeral => "ephemeral",
        Suspend => "suspend",
        Crashdump => "crashdump",
        HaStatefile => "ha_statefile",
        Metadata => "metadata",
        RedoLog => "redo_log",
        Rrd => "rrd",
        PvsCache => "pvs_cache",
        CbtMetadata => "cbt_metadata",
    }
}

xapi_enum! {
    /// 虚拟磁盘操作
    pub enum VdiOperations {
        Clone => "clone",
        Copy => "copy",
        Resize => "resize",
        ResizeOnline => "resize_online",
        Snapshot => "snapshot",
        Mirror => "mirror",
        Destroy => "destroy",
        Forget => "forget",
        Update => "update",
        ForceUnlock => "force_unlock",
        GenerateConfig => "generate_config",
        EnableCbt => "enable_cbt",
        DisableCbt => "disable_cbt",
        DataDestroy => "data_destroy",
        ListChangedBlocks => "list_changed_blocks",
        SetOnBoot => "set_on_boot",
        Blocked => "blocked",
    }
}

xapi_enum! {
    /// 存储仓库操作
    pub enum StorageOperations {
        Scan => "scan",
        Destroy => "destroy",
        Forget => "forget",
        Plug => "plug",
        Unplug => "unplug",
        Update => "update",
        VdiCreate => "vdi_create",
        VdiIntroduce => "vdi_introduce",
        VdiDestroy => "vdi_destroy",
        VdiResize => "vdi_resize",
        VdiClone => "vdi_clone",
        VdiSnapshot => "vdi_snapshot",
        VdiMirror => "vdi_mirror",
        VdiEnableCbt => "vdi_enable_cbt",
        VdiDisableCbt => "vdi_disable_cbt",
        VdiDataDestroy => "vdi_data_destroy",
        VdiListChangedBlocks => "vdi_list_changed_blocks",
        VdiSetOnBoot => "vdi_set_on_boot",
        PbdCreate => "pbd_create",
        PbdDestroy => "pbd_destroy",
    }
}

xapi_enum! {
    /// 虚拟磁盘启动时行为
    pub enum OnBoot {
        /// 启动时恢复到快照状态
        Reset => "reset",
        /// 保留修改
        Persist => "persist",
    }
}

xapi_enum! {
    /// 虚拟块设备操作
    pub enum VbdOperations {
        Attach => "attach",
        Eject => "eject",
        Insert => "insert",
        Plug => "plug",
        Unplug => "unplug",
        UnplugForce => "unplug_force",
        Pause => "pause",
        Unpause => "unpause",
    }
}

xapi_enum! {
    /// 虚拟块设备读写模式
    pub enum VbdMode {
        Ro => "RO",
        Rw => "RW",
    }
}

xapi_enum! {
    /// 虚拟块设备类型
    pub enum VbdType {
        Cd => "CD",
        Disk => "Disk",
        Floppy => "Floppy",
    }
}

xapi_enum! {
    /// 网络操作
    pub enum NetworkOperations {
        Attaching => "attaching",
    }
}

xapi_enum! {
    /// 任务状态
    pub enum TaskStatusType {
        Pending => "pending",
        Success => "success",
        Failure => "failure",
        Cancelling => "cancelling",
        Cancelled => "cancelled",
    }
}

xapi_enum! {
    /// 任务操作
    pub enum TaskAllowedOperations {
        Cancel => "cancel",
        Destroy => "destroy",
    }
}

xapi_enum! {
    /// 事件操作类型
    pub enum EventOperation {
        /// 对象创建
        Add => "add",
        /// 对象删除
        Del => "del",
        /// 对象修改
        Mod => "mod",
    }
}

impl TaskStatusType {
    /// 是否为终态（cancelling 不是终态）
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Context, FromXapi, ToXapi};
    use xapi_xmlrpc::Value;

    #[test]
    fn test_case_insensitive_parse() {
        assert_eq!(VmPowerState::parse("running"), VmPowerState::Running);
        assert_eq!(VbdMode::parse("rw"), VbdMode::Rw);
        assert_eq!(VbdMode::Rw.as_str(), "RW");
    }

    #[test]
    fn test_unrecognized_keeps_original() {
        let cx = Context::new("power_state");
        let state = VmPowerState::from_xapi(&Value::from("Migrating"), &cx).unwrap();
        assert_eq!(state, VmPowerState::Unrecognized("Migrating".to_string()));
        assert_eq!(state.to_xapi(&cx).unwrap(), Value::from("Migrating"));
    }

    #[test]
    fn test_terminal_status() {
        assert!(TaskStatusType::Success.is_terminal());
        assert!(TaskStatusType::Cancelled.is_terminal());
        assert!(!TaskStatusType::Cancelling.is_terminal());
        assert!(!TaskStatusType::Pending.is_terminal());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&VdiType::PvsCache).unwrap();
        assert_eq!(json, "\"pvs_cache\"");
        let back: VdiType = serde_json::from_str("\"PVS_CACHE\"").unwrap();
        assert_eq!(back, VdiType::PvsCache);
    }
}
