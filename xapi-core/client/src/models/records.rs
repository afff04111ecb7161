//! 服务端记录
//!
//! 字段名与线路名一一对应；集合字段以 `Vec` 表示，保留服务端顺序。

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::enums::*;
use crate::codec::xapi_record;
use crate::reference::classes::*;

type StringMap = HashMap<String, String>;

xapi_record! {
    /// 会话记录
    pub struct SessionRecord {
        pub uuid: String => "uuid",
        pub this_host: HostRef => "this_host",
        pub last_active: DateTime<Utc> => "last_active",
        pub pool: bool => "pool",
        pub other_config: StringMap => "other_config",
        pub is_local_superuser: bool => "is_local_superuser",
        pub validation_time: DateTime<Utc> => "validation_time",
        pub auth_user_sid: String => "auth_user_sid",
        pub auth_user_name: String => "auth_user_name",
        pub rbac_permissions: Vec<String> => "rbac_permissions",
        pub tasks: Vec<TaskRef> => "tasks",
        pub parent: SessionRef => "parent",
        pub originator: String => "originator",
        pub client_certificate: bool => "client_certificate",
    }
}

xapi_record! {
    /// 任务记录
    pub struct TaskRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub allowed_operations: Vec<TaskAllowedOperations> => "allowed_operations",
        pub current_operations: HashMap<String, TaskAllowedOperations> => "current_operations",
        pub created: DateTime<Utc> => "created",
        pub finished: DateTime<Utc> => "finished",
        pub status: TaskStatusType => "status",
        pub resident_on: HostRef => "resident_on",
        /// 进度，取值 [0.0, 1.0]
        pub progress: f64 => "progress",
        pub task_type: String => "type",
        /// 成功时的结果（字符串或 XML-RPC `<value>` 文档）
        pub result: String => "result",
        /// 失败时的 `[错误码, 参数…]`
        pub error_info: Vec<String> => "error_info",
        pub other_config: StringMap => "other_config",
        pub subtask_of: TaskRef => "subtask_of",
        pub subtasks: Vec<TaskRef> => "subtasks",
        pub backtrace: String => "backtrace",
    }
}

xapi_record! {
    /// 资源池记录
    pub struct PoolRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        /// 池协调者
        pub master: HostRef => "master",
        pub default_sr: SrRef => "default_SR",
        pub suspend_image_sr: SrRef => "suspend_image_SR",
        pub crash_dump_sr: SrRef => "crash_dump_SR",
        pub other_config: StringMap => "other_config",
        pub ha_enabled: bool => "ha_enabled",
        pub ha_configuration: StringMap => "ha_configuration",
        pub ha_host_failures_to_tolerate: i64 => "ha_host_failures_to_tolerate",
        pub tags: Vec<String> => "tags",
        pub gui_config: StringMap => "gui_config",
        pub restrictions: StringMap => "restrictions",
        pub metadata_vdis: Vec<VdiRef> => "metadata_VDIs",
        pub cpu_info: StringMap => "cpu_info",
        pub tls_verification_enabled: bool => "tls_verification_enabled",
    }
}

xapi_record! {
    /// 主机记录
    pub struct HostRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub memory_overhead: i64 => "memory_overhead",
        pub allowed_operations: Vec<HostAllowedOperations> => "allowed_operations",
        pub current_operations: HashMap<String, HostAllowedOperations> => "current_operations",
        pub api_version_major: i64 => "API_version_major",
        pub api_version_minor: i64 => "API_version_minor",
        pub api_version_vendor: String => "API_version_vendor",
        pub enabled: bool => "enabled",
        pub software_version: StringMap => "software_version",
        pub other_config: StringMap => "other_config",
        pub capabilities: Vec<String> => "capabilities",
        pub cpu_configuration: StringMap => "cpu_configuration",
        pub resident_vms: Vec<VmRef> => "resident_VMs",
        pub pifs: Vec<PifRef> => "PIFs",
        pub suspend_image_sr: SrRef => "suspend_image_sr",
        pub crash_dump_sr: SrRef => "crash_dump_sr",
        pub pbds: Vec<PbdRef> => "PBDs",
        pub cpu_info: StringMap => "cpu_info",
        pub hostname: String => "hostname",
        /// 管理地址
        pub address: String => "address",
        pub tags: Vec<String> => "tags",
        pub edition: String => "edition",
        pub bios_strings: StringMap => "bios_strings",
        pub local_cache_sr: SrRef => "local_cache_sr",
        pub control_domain: VmRef => "control_domain",
        pub iscsi_iqn: String => "iscsi_iqn",
        pub multipathing: bool => "multipathing",
        pub tls_verification_enabled: bool => "tls_verification_enabled",
    }
}

xapi_record! {
    /// 虚拟机记录
    pub struct VmRecord {
        pub uuid: String => "uuid",
        pub allowed_operations: Vec<VmOperations> => "allowed_operations",
        pub current_operations: HashMap<String, VmOperations> => "current_operations",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub power_state: VmPowerState => "power_state",
        pub user_version: i64 => "user_version",
        pub is_a_template: bool => "is_a_template",
        pub is_default_template: bool => "is_default_template",
        pub suspend_vdi: VdiRef => "suspend_VDI",
        pub resident_on: HostRef => "resident_on",
        pub affinity: HostRef => "affinity",
        pub memory_overhead: i64 => "memory_overhead",
        pub memory_target: i64 => "memory_target",
        pub memory_static_max: i64 => "memory_static_max",
        pub memory_dynamic_max: i64 => "memory_dynamic_max",
        pub memory_dynamic_min: i64 => "memory_dynamic_min",
        pub memory_static_min: i64 => "memory_static_min",
        pub vcpus_params: StringMap => "VCPUs_params",
        pub vcpus_max: i64 => "VCPUs_max",
        pub vcpus_at_startup: i64 => "VCPUs_at_startup",
        pub crash_dumps: Vec<CrashdumpRef> => "crash_dumps",
        pub vifs: Vec<VifRef> => "VIFs",
        pub vbds: Vec<VbdRef> => "VBDs",
        pub pv_bootloader: String => "PV_bootloader",
        pub pv_kernel: String => "PV_kernel",
        pub pv_args: String => "PV_args",
        pub hvm_boot_policy: String => "HVM_boot_policy",
        pub hvm_boot_params: StringMap => "HVM_boot_params",
        pub hvm_shadow_multiplier: f64 => "HVM_shadow_multiplier",
        pub platform: StringMap => "platform",
        pub other_config: StringMap => "other_config",
        pub domid: i64 => "domid",
        pub is_control_domain: bool => "is_control_domain",
        pub xenstore_data: StringMap => "xenstore_data",
        pub ha_always_run: bool => "ha_always_run",
        pub ha_restart_priority: String => "ha_restart_priority",
        pub is_a_snapshot: bool => "is_a_snapshot",
        pub snapshot_of: VmRef => "snapshot_of",
        pub snapshots: Vec<VmRef> => "snapshots",
        pub snapshot_time: DateTime<Utc> => "snapshot_time",
        pub tags: Vec<String> => "tags",
        pub blocked_operations: HashMap<VmOperations, String> => "blocked_operations",
        pub parent: VmRef => "parent",
        pub children: Vec<VmRef> => "children",
        pub bios_strings: StringMap => "bios_strings",
        pub start_delay: i64 => "start_delay",
        pub shutdown_delay: i64 => "shutdown_delay",
        pub order: i64 => "order",
        pub suspend_sr: SrRef => "suspend_SR",
        pub version: i64 => "version",
        pub generation_id: String => "generation_id",
        pub has_vendor_device: bool => "has_vendor_device",
        pub requires_reboot: bool => "requires_reboot",
        pub reference_label: String => "reference_label",
    }
}

xapi_record! {
    /// 存储仓库记录
    pub struct SrRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub allowed_operations: Vec<StorageOperations> => "allowed_operations",
        pub current_operations: HashMap<String, StorageOperations> => "current_operations",
        pub vdis: Vec<VdiRef> => "VDIs",
        pub pbds: Vec<PbdRef> => "PBDs",
        pub virtual_allocation: i64 => "virtual_allocation",
        pub physical_utilisation: i64 => "physical_utilisation",
        pub physical_size: i64 => "physical_size",
        pub sr_type: String => "type",
        pub content_type: String => "content_type",
        pub shared: bool => "shared",
        pub other_config: StringMap => "other_config",
        pub tags: Vec<String> => "tags",
        pub sm_config: StringMap => "sm_config",
        pub local_cache_enabled: bool => "local_cache_enabled",
        pub clustered: bool => "clustered",
        pub is_tools_sr: bool => "is_tools_sr",
    }
}

xapi_record! {
    /// 虚拟磁盘记录
    pub struct VdiRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub allowed_operations: Vec<VdiOperations> => "allowed_operations",
        pub current_operations: HashMap<String, VdiOperations> => "current_operations",
        pub sr: SrRef => "SR",
        pub vbds: Vec<VbdRef> => "VBDs",
        pub crash_dumps: Vec<CrashdumpRef> => "crash_dumps",
        /// 虚拟容量（字节）
        pub virtual_size: i64 => "virtual_size",
        pub physical_utilisation: i64 => "physical_utilisation",
        pub vdi_type: VdiType => "type",
        pub sharable: bool => "sharable",
        pub read_only: bool => "read_only",
        pub other_config: StringMap => "other_config",
        pub storage_lock: bool => "storage_lock",
        pub location: String => "location",
        pub managed: bool => "managed",
        pub missing: bool => "missing",
        pub parent: VdiRef => "parent",
        pub xenstore_data: StringMap => "xenstore_data",
        pub sm_config: StringMap => "sm_config",
        pub is_a_snapshot: bool => "is_a_snapshot",
        pub snapshot_of: VdiRef => "snapshot_of",
        pub snapshots: Vec<VdiRef> => "snapshots",
        pub snapshot_time: DateTime<Utc> => "snapshot_time",
        pub tags: Vec<String> => "tags",
        pub allow_caching: bool => "allow_caching",
        pub on_boot: OnBoot => "on_boot",
        pub metadata_of_pool: PoolRef => "metadata_of_pool",
        pub metadata_latest: bool => "metadata_latest",
        pub is_tools_iso: bool => "is_tools_iso",
        pub cbt_enabled: bool => "cbt_enabled",
    }
}

xapi_record! {
    /// 物理块设备记录
    pub struct PbdRecord {
        pub uuid: String => "uuid",
        pub host: HostRef => "host",
        pub sr: SrRef => "SR",
        pub device_config: StringMap => "device_config",
        pub currently_attached: bool => "currently_attached",
        pub other_config: StringMap => "other_config",
    }
}

xapi_record! {
    /// 虚拟块设备记录
    pub struct VbdRecord {
        pub uuid: String => "uuid",
        pub allowed_operations: Vec<VbdOperations> => "allowed_operations",
        pub current_operations: HashMap<String, VbdOperations> => "current_operations",
        pub vm: VmRef => "VM",
        pub vdi: VdiRef => "VDI",
        pub device: String => "device",
        pub userdevice: String => "userdevice",
        pub bootable: bool => "bootable",
        pub mode: VbdMode => "mode",
        pub vbd_type: VbdType => "type",
        pub unpluggable: bool => "unpluggable",
        pub storage_lock: bool => "storage_lock",
        pub empty: bool => "empty",
        pub other_config: StringMap => "other_config",
        pub currently_attached: bool => "currently_attached",
        pub status_code: i64 => "status_code",
        pub status_detail: String => "status_detail",
        pub runtime_properties: StringMap => "runtime_properties",
        pub qos_algorithm_type: String => "qos_algorithm_type",
        pub qos_algorithm_params: StringMap => "qos_algorithm_params",
        pub qos_supported_algorithms: Vec<String> => "qos_supported_algorithms",
    }
}

xapi_record! {
    /// 网络记录
    pub struct NetworkRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        pub allowed_operations: Vec<NetworkOperations> => "allowed_operations",
        pub current_operations: HashMap<String, NetworkOperations> => "current_operations",
        pub vifs: Vec<VifRef> => "VIFs",
        pub pifs: Vec<PifRef> => "PIFs",
        pub mtu: i64 => "MTU",
        pub other_config: StringMap => "other_config",
        pub bridge: String => "bridge",
        pub managed: bool => "managed",
        pub tags: Vec<String> => "tags",
        pub assigned_ips: HashMap<VifRef, String> => "assigned_ips",
    }
}

xapi_record! {
    /// PVS 站点记录
    pub struct PvsSiteRecord {
        pub uuid: String => "uuid",
        pub name_label: String => "name_label",
        pub name_description: String => "name_description",
        /// 外部 PVS 站点标识
        pub pvs_uuid: String => "PVS_uuid",
        pub cache_storage: Vec<String> => "cache_storage",
        pub servers: Vec<String> => "servers",
        pub proxies: Vec<String> => "proxies",
    }
}

xapi_record! {
    /// 崩溃转储记录
    pub struct CrashdumpRecord {
        pub uuid: String => "uuid",
        pub vm: VmRef => "VM",
        pub vdi: VdiRef => "VDI",
        pub other_config: StringMap => "other_config",
    }
}
