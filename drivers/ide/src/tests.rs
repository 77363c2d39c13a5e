//! Command-level tests for the taskfile transport
//!
//! Drives whole ATA exchanges through the loopback bus the way the block
//! layer would, and checks the exact bus cycles that result.

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec, vec::Vec};
    use core::sync::atomic::{AtomicU32, Ordering};
    use lib_kernel::{
        loopback::{Access, LoopbackBus},
        KernelError,
    };
    use spin::Mutex;

    use crate::{
        consts::*, init, IdeHostHandle, IdeHostRegistry, IdePortInfo, IdeRegs, IdeTransport,
        Taskfile, TaskfileOps, TfValid,
    };

    const BASE: usize = 0x00F7_F300;

    fn loopback() -> (Arc<LoopbackBus>, IdeRegs) {
        let bus = Arc::new(LoopbackBus::new());
        let regs = IdeRegs::ddraig(BASE);
        bus.split(regs.status).split(regs.altstatus);
        bus.fifo(regs.data);
        (bus, regs)
    }

    fn transport() -> (Arc<LoopbackBus>, Arc<IdeTransport<Arc<LoopbackBus>>>) {
        let (bus, regs) = loopback();
        (bus.clone(), Arc::new(IdeTransport::new(bus, regs)))
    }

    #[test]
    fn test_ddraig_register_map() {
        let regs = IdeRegs::ddraig(BASE);
        assert_eq!(regs.data.addr(), 0x00F7_F300);
        assert_eq!(regs.device.addr(), 0x00F7_F30C);
        assert_eq!(regs.status.addr(), 0x00F7_F30E);
        assert_eq!(regs.altstatus.addr(), 0x00F7_F38C);
    }

    #[test]
    fn test_select_device_sets_obsolete_bits() {
        let (bus, ide) = transport();
        ide.select_device(ATA_DEV1);
        assert_eq!(bus.latched(ide.regs().device), Some(0xB0));
    }

    #[test]
    fn test_command_and_status_share_an_address() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        bus.set(regs.status, ATA_SR_DRDY);
        ide.exec_command(ATA_CMD_IDENTIFY);

        assert_eq!(bus.latched(regs.status), Some(ATA_CMD_IDENTIFY));
        assert_eq!(ide.read_status(), ATA_SR_DRDY);
    }

    #[test]
    fn test_odd_length_out_pads_with_zero() {
        let (bus, ide) = transport();
        assert_eq!(ide.stream_out(&[0x12, 0x34, 0x56]), 2);
        assert_eq!(bus.drain_words(ide.regs().data), [0x1234, 0x5600]);
    }

    #[test]
    fn test_odd_length_in_reads_final_word() {
        let (bus, ide) = transport();
        bus.push_word(ide.regs().data, 0xABCD);
        bus.push_word(ide.regs().data, 0xEF99);

        let mut buf = [0u8; 3];
        assert_eq!(ide.stream_in(&mut buf), 3);
        assert_eq!(buf, [0xAB, 0xCD, 0xEF]);
        assert_eq!(bus.count(|a| matches!(a, Access::Read16(..))), 2);
    }

    #[test]
    fn test_lba28_packs_device_nibble() {
        let tf = Taskfile::lba28(0x0A12_3456, 4, true);
        assert_eq!((tf.lbal, tf.lbam, tf.lbah), (0x56, 0x34, 0x12));
        assert_eq!(tf.device, ATA_LBA | ATA_DEV1 | 0x0A);
        assert_eq!(tf.nsect, 4);
    }

    #[test]
    fn test_taskfile_mask_round_trip() {
        let (bus, ide) = transport();
        let tf = Taskfile {
            feature: 0x03,
            nsect: 0x01,
            lbal: 0x10,
            lbam: 0x20,
            lbah: 0x30,
            device: 0xE0,
            command: 0,
        };

        ide.load_taskfile(&tf, TfValid::ALL);
        assert_eq!(bus.count(Access::is_write), 6);

        // Feature and error share an address, so the round trip sees it too.
        let mut back = Taskfile::default();
        ide.read_taskfile(&mut back, TfValid::ALL);
        assert_eq!(back, tf);
    }

    #[test]
    fn test_partial_mask_leaves_other_fields() {
        let (bus, ide) = transport();
        let regs = *ide.regs();

        let tf = Taskfile { nsect: 8, lbah: 0x44, device: 0xE0, ..Taskfile::default() };
        ide.load_taskfile(&tf, TfValid::NSECT | TfValid::DEVICE);
        assert_eq!(bus.writes_to(regs.nsect), [8]);
        assert_eq!(bus.writes_to(regs.device), [0xE0]);
        assert!(bus.writes_to(regs.lbah).is_empty());

        let mut back = Taskfile { lbal: 0x5A, ..Taskfile::default() };
        ide.read_taskfile(&mut back, TfValid::NSECT);
        assert_eq!(back.nsect, 8);
        assert_eq!(back.lbal, 0x5A);
        assert_eq!(back.device, 0);
    }

    #[test]
    fn test_every_mask_subset_round_trips() {
        let tf = Taskfile {
            feature: 0x03,
            nsect: 0x01,
            lbal: 0x10,
            lbam: 0x20,
            lbah: 0x30,
            device: 0xE0,
            command: 0,
        };
        let all = TfValid::ALL.bits();

        for bits in 0..=all {
            if bits & !all != 0 {
                continue;
            }
            let valid = TfValid::from_bits(bits);
            let (bus, ide) = transport();
            let regs = *ide.regs();
            ide.load_taskfile(&tf, valid);

            let fields = [
                (TfValid::FEATURE, regs.feature, tf.feature),
                (TfValid::NSECT, regs.nsect, tf.nsect),
                (TfValid::LBAL, regs.lbal, tf.lbal),
                (TfValid::LBAM, regs.lbam, tf.lbam),
                (TfValid::LBAH, regs.lbah, tf.lbah),
                (TfValid::DEVICE, regs.device, tf.device),
            ];
            for (field, reg, value) in fields {
                if valid.has(field) {
                    assert_eq!(bus.writes_to(reg), [value], "mask {:#04x}", bits);
                } else {
                    assert!(bus.writes_to(reg).is_empty(), "mask {:#04x}", bits);
                }
            }

            let mut back = Taskfile::default();
            ide.read_taskfile(&mut back, valid);
            let read = [
                (TfValid::FEATURE, back.feature, tf.feature),
                (TfValid::NSECT, back.nsect, tf.nsect),
                (TfValid::LBAL, back.lbal, tf.lbal),
                (TfValid::LBAM, back.lbam, tf.lbam),
                (TfValid::LBAH, back.lbah, tf.lbah),
                (TfValid::DEVICE, back.device, tf.device),
            ];
            for (field, got, want) in read {
                let want = if valid.has(field) { want } else { 0 };
                assert_eq!(got, want, "mask {:#04x}", bits);
            }
        }
    }

    #[test]
    fn test_empty_mask_is_no_bus_traffic() {
        let (bus, ide) = transport();
        let mut tf = Taskfile::default();
        ide.load_taskfile(&Taskfile::lba28(7, 1, false), TfValid::NONE);
        ide.read_taskfile(&mut tf, TfValid::NONE);
        assert!(bus.accesses().is_empty());
        assert_eq!(tf, Taskfile::default());
    }

    #[test]
    fn test_load_order_follows_registers() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        ide.load_taskfile(&Taskfile::lba28(0x0012_3456, 1, false), TfValid::ALL);

        let order: Vec<usize> = bus.accesses().iter().map(Access::addr).collect();
        assert_eq!(
            order,
            [regs.feature, regs.nsect, regs.lbal, regs.lbam, regs.lbah, regs.device]
                .map(|r| r.addr())
        );
    }

    #[test]
    fn test_read_one_sector() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        for i in 0..256u16 {
            bus.push_word(regs.data, i);
        }

        let tf = Taskfile { nsect: 1, lbal: 0x10, device: ATA_DEVICE_OBS, ..Taskfile::default() };
        ide.load_taskfile(&tf, TfValid::NSECT | TfValid::LBAL | TfValid::DEVICE);
        ide.exec_command(ATA_CMD_READ_PIO);
        bus.clear_log();

        let mut sector = vec![0u8; SECTOR_SIZE];
        assert_eq!(ide.stream_in(&mut sector), SECTOR_SIZE);

        let log = bus.accesses();
        assert_eq!(log.len(), 256);
        assert!(log
            .iter()
            .all(|a| matches!(a, Access::Read16(addr, _) if *addr == regs.data.addr())));
        assert_eq!(&sector[..4], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&sector[510..], &[0x00, 0xFF]);
    }

    #[test]
    fn test_command_issue_writes_taskfile_then_command() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        let tf = Taskfile { nsect: 1, lbal: 0x10, device: ATA_DEVICE_OBS, ..Taskfile::default() };

        ide.load_taskfile(&tf, TfValid::NSECT | TfValid::LBAL | TfValid::DEVICE);
        ide.exec_command(ATA_CMD_READ_PIO);

        assert_eq!(
            bus.accesses(),
            [
                Access::Write8(regs.nsect.addr(), 1),
                Access::Write8(regs.lbal.addr(), 0x10),
                Access::Write8(regs.device.addr(), ATA_DEVICE_OBS),
                Access::Write8(regs.status.addr(), ATA_CMD_READ_PIO),
            ]
        );
    }

    #[test]
    fn test_stream_round_trips() {
        for len in [0usize, 1, 2, 7, 512] {
            let (bus, ide) = transport();
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 1) as u8).collect();

            let words = ide.stream_out(&data);
            assert_eq!(words, len.div_ceil(2));

            // Hand the words back to the read side.
            for w in bus.drain_words(ide.regs().data) {
                bus.push_word(ide.regs().data, w);
            }
            let mut back = vec![0u8; len];
            assert_eq!(ide.stream_in(&mut back), len);
            assert_eq!(back, data);
        }
    }

    #[test]
    fn test_status_read_consumes_interrupt() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        bus.clear_on_read(regs.status, ATA_SR_DRDY);
        bus.set(regs.status, ATA_SR_DRDY | ATA_SR_DRQ);

        assert_eq!(ide.read_status(), ATA_SR_DRDY | ATA_SR_DRQ);
        assert_eq!(ide.read_status(), ATA_SR_DRDY);
    }

    #[test]
    fn test_alt_status_does_not_consume() {
        let (bus, ide) = transport();
        let regs = *ide.regs();
        bus.clear_on_read(regs.status, ATA_SR_DRDY);
        bus.set(regs.status, ATA_SR_DRDY | ATA_SR_DRQ);
        bus.set(regs.altstatus, ATA_SR_DRDY | ATA_SR_DRQ);

        assert_eq!(ide.read_alt_status(), ATA_SR_DRDY | ATA_SR_DRQ);
        assert_eq!(ide.read_alt_status(), ATA_SR_DRDY | ATA_SR_DRQ);
        assert_eq!(bus.peek(regs.status), ATA_SR_DRDY | ATA_SR_DRQ);
    }

    #[test]
    fn test_ops_object_is_usable_as_trait() {
        let (bus, ide) = transport();
        let ops: Arc<dyn TaskfileOps> = ide.clone();
        ops.select_device(ATA_LBA);
        ops.write_device_control(ATA_SRST);
        assert_eq!(bus.latched(ide.regs().device), Some(ATA_DEVICE_OBS | ATA_LBA));
        assert_eq!(bus.latched(ide.regs().altstatus), Some(ATA_SRST));
    }

    /* ------------------------------------------------------------------ */

    #[derive(Default)]
    struct FakeHosts {
        fail_alloc: bool,
        register_rc: i32,
        next: AtomicU32,
        freed: Mutex<Vec<IdeHostHandle>>,
        bound: Mutex<Option<IdePortInfo>>,
    }

    impl IdeHostRegistry for FakeHosts {
        fn host_alloc(&self, info: &IdePortInfo, _ops: Arc<dyn TaskfileOps>) -> Option<IdeHostHandle> {
            if self.fail_alloc {
                return None;
            }
            *self.bound.lock() = Some(*info);
            Some(IdeHostHandle(self.next.fetch_add(1, Ordering::Relaxed)))
        }

        fn host_register(&self, _host: IdeHostHandle, _info: &IdePortInfo) -> Result<(), i32> {
            match self.register_rc {
                0 => Ok(()),
                rc => Err(rc),
            }
        }

        fn host_free(&self, host: IdeHostHandle) {
            self.freed.lock().push(host);
        }
    }

    #[test]
    fn test_init_binds_port_info() {
        let (_bus, ide) = transport();
        let hosts = FakeHosts::default();

        assert_eq!(init(ide, &hosts), Ok(IdeHostHandle(0)));
        let info = hosts.bound.lock().expect("host was allocated");
        assert_eq!(info.data_addr, BASE);
        assert_eq!(info.irq, lib_kernel::board::IRQ_NUM_IDE);
        assert!(info.host_flags.contains(crate::HostFlags::NO_DMA));
        assert!(hosts.freed.lock().is_empty());
    }

    #[test]
    fn test_init_alloc_failure_is_out_of_memory() {
        let (_bus, ide) = transport();
        let hosts = FakeHosts { fail_alloc: true, ..FakeHosts::default() };

        let err = init(ide, &hosts).unwrap_err();
        assert_eq!(err, KernelError::OutOfMemory);
        assert_eq!(err.errno(), -12);
    }

    #[test]
    fn test_init_register_failure_frees_host() {
        let (_bus, ide) = transport();
        let hosts = FakeHosts { register_rc: -19, ..FakeHosts::default() };

        assert_eq!(init(ide, &hosts), Err(KernelError::Collaborator(-19)));
        assert_eq!(*hosts.freed.lock(), [IdeHostHandle(0)]);
    }
}
