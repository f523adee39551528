use altaid_core::cpu::I8080;
mod common;
use common::TestBus;

// =============================================================================
// Jumps
// =============================================================================

#[test]
fn test_jmp() {
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x00, 0x20]); // JMP 0x2000
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc, 0x2000);
}

#[test]
fn test_conditional_jump_costs_ten_either_way() {
    // JNZ with Z set: not taken
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.z = true;
    bus.load(0, &[0xC2, 0x00, 0x20]); // JNZ 0x2000
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc, 3, "falls through past the address bytes");

    // JZ with Z set: taken
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.z = true;
    bus.load(0, &[0xCA, 0x00, 0x20]); // JZ 0x2000
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc, 0x2000);
}

#[test]
fn test_all_jump_conditions() {
    // (opcode, flag setter, expect_taken)
    let cases: &[(u8, fn(&mut I8080), bool)] = &[
        (0xC2, |c| c.z = false, true),  // JNZ
        (0xCA, |c| c.z = true, true),   // JZ
        (0xD2, |c| c.cy = false, true), // JNC
        (0xDA, |c| c.cy = true, true),  // JC
        (0xE2, |c| c.p = false, true),  // JPO
        (0xEA, |c| c.p = true, true),   // JPE
        (0xF2, |c| c.s = false, true),  // JP
        (0xFA, |c| c.s = true, true),   // JM
        (0xC2, |c| c.z = true, false),
        (0xDA, |c| c.cy = false, false),
    ];
    for &(op, setup, taken) in cases {
        let mut cpu = I8080::new();
        let mut bus = TestBus::new();
        setup(&mut cpu);
        bus.load(0, &[op, 0x00, 0x30]);
        cpu.step(&mut bus);
        let expect = if taken { 0x3000 } else { 3 };
        assert_eq!(cpu.pc, expect, "opcode {op:#04x}");
    }
}

#[test]
fn test_pchl() {
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4567);
    bus.load(0, &[0xE9]);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc, 0x4567);
}

// =============================================================================
// Calls and returns
// =============================================================================

#[test]
fn test_call_pushes_return_address() {
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    bus.load(0x0100, &[0xCD, 0x00, 0x20]); // CALL 0x2000
    cpu.pc = 0x0100;
    assert_eq!(cpu.step(&mut bus), 17);
    assert_eq!(cpu.pc, 0x2000);
    assert_eq!(cpu.sp, 0x7FFE);
    assert_eq!(bus.memory[0x7FFE], 0x03, "return address low byte");
    assert_eq!(bus.memory[0x7FFF], 0x01, "return address high byte");
}

#[test]
fn test_ret() {
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x7FFE;
    bus.memory[0x7FFE] = 0x03;
    bus.memory[0x7FFF] = 0x01;
    bus.load(0, &[0xC9]);
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc, 0x0103);
    assert_eq!(cpu.sp, 0x8000);
}

#[test]
fn test_conditional_call_cycles() {
    // Taken: 17
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    cpu.cy = true;
    bus.load(0, &[0xDC, 0x00, 0x20]); // CC 0x2000
    assert_eq!(cpu.step(&mut bus), 17);
    assert_eq!(cpu.pc, 0x2000);

    // Not taken: 11
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    cpu.cy = false;
    bus.load(0, &[0xDC, 0x00, 0x20]);
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.pc, 3);
    assert_eq!(cpu.sp, 0x8000, "nothing pushed when not taken");
}

#[test]
fn test_conditional_return_cycles() {
    // Taken: 11
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x7FFE;
    cpu.z = true;
    bus.memory[0x7FFE] = 0x00;
    bus.memory[0x7FFF] = 0x10;
    bus.load(0, &[0xC8]); // RZ
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.pc, 0x1000);

    // Not taken: 5
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x7FFE;
    cpu.z = false;
    bus.load(0, &[0xC8]);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_call_ret_round_trip() {
    let mut cpu = I8080::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    bus.load(0, &[0xCD, 0x00, 0x10]); // CALL 0x1000
    bus.load(0x1000, &[0xC9]); // RET
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 3);
    assert_eq!(cpu.sp, 0x8000);
}

// =============================================================================
// RST
// =============================================================================

#[test]
fn test_rst_vectors() {
    for n in 0..8u16 {
        let mut cpu = I8080::new();
        let mut bus = TestBus::new();
        cpu.sp = 0x8000;
        cpu.pc = 0x0200;
        bus.load(0x0200, &[0xC7 | (n as u8) << 3]); // RST n
        assert_eq!(cpu.step(&mut bus), 11);
        assert_eq!(cpu.pc, n * 8);
        assert_eq!(bus.memory[0x7FFE], 0x01, "pushed PC low");
        assert_eq!(bus.memory[0x7FFF], 0x02, "pushed PC high");
    }
}
