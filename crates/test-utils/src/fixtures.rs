// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures and sample SQL scripts

use sqlscript_catalog::Catalog;
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_grammar::{parse, scan};
use sqlscript_ir::CatalogEntryId;
use sqlscript_semantic::{AnalyzedScript, Analyzer};
use std::sync::Arc;

/// Marks the cursor in fixture text
pub const CURSOR_MARKER: char = '|';

/// Sample SQL scripts for testing
pub struct SqlFixtures;

impl SqlFixtures {
    // ===== Schema scripts =====

    /// The eight TPC-H tables
    pub const fn tpch_schema() -> &'static str {
        "create table part (
            p_partkey integer not null primary key,
            p_name varchar(55) not null,
            p_mfgr char(25) not null,
            p_brand char(10) not null,
            p_type varchar(25) not null,
            p_size integer not null,
            p_container char(10) not null,
            p_retailprice decimal(15,2) not null,
            p_comment varchar(23) not null
        );
        create table supplier (
            s_suppkey integer not null primary key,
            s_name char(25) not null,
            s_address varchar(40) not null,
            s_nationkey integer not null,
            s_phone char(15) not null,
            s_acctbal decimal(15,2) not null,
            s_comment varchar(101) not null
        );
        create table partsupp (
            ps_partkey integer not null,
            ps_suppkey integer not null,
            ps_availqty integer not null,
            ps_supplycost decimal(15,2) not null,
            ps_comment varchar(199) not null
        );
        create table customer (
            c_custkey integer not null primary key,
            c_name varchar(25) not null,
            c_address varchar(40) not null,
            c_nationkey integer not null,
            c_phone char(15) not null,
            c_acctbal decimal(15,2) not null,
            c_mktsegment char(10) not null,
            c_comment varchar(117) not null
        );
        create table orders (
            o_orderkey integer not null primary key,
            o_custkey integer not null,
            o_orderstatus char(1) not null,
            o_totalprice decimal(15,2) not null,
            o_orderdate date not null,
            o_orderpriority char(15) not null,
            o_clerk char(15) not null,
            o_shippriority integer not null,
            o_comment varchar(79) not null
        );
        create table lineitem (
            l_orderkey integer not null,
            l_partkey integer not null,
            l_suppkey integer not null,
            l_linenumber integer not null,
            l_quantity decimal(15,2) not null,
            l_extendedprice decimal(15,2) not null,
            l_discount decimal(15,2) not null,
            l_tax decimal(15,2) not null,
            l_returnflag char(1) not null,
            l_linestatus char(1) not null,
            l_shipdate date not null,
            l_commitdate date not null,
            l_receiptdate date not null,
            l_shipinstruct char(25) not null,
            l_shipmode char(10) not null,
            l_comment varchar(44) not null
        );
        create table nation (
            n_nationkey integer not null primary key,
            n_name char(25) not null,
            n_regionkey integer not null,
            n_comment varchar(152)
        );
        create table region (
            r_regionkey integer not null primary key,
            r_name char(25) not null,
            r_comment varchar(152)
        );"
    }

    /// Number of tables in [`SqlFixtures::tpch_schema`]
    pub const TPCH_TABLE_COUNT: usize = 8;

    // ===== Queries =====

    /// Simple SELECT with column list
    pub const fn simple_select() -> &'static str {
        "select c_custkey, c_name from customer"
    }

    /// SELECT with WHERE clause
    pub const fn select_with_where() -> &'static str {
        "select c_name from customer where c_acctbal > 1000 and c_mktsegment = 'BUILDING'"
    }

    /// Aliased multi-table query used for cursor placement
    pub const fn cursor_script() -> &'static str {
        "select * from A b, C d where b.x = d.y"
    }

    /// Shipping priority query, TPC-H Q3
    pub const fn tpch_q3() -> &'static str {
        "select l_orderkey, sum(l_extendedprice * (1 - l_discount)) as revenue,
                o_orderdate, o_shippriority
         from customer, orders, lineitem
         where c_mktsegment = 'BUILDING'
           and c_custkey = o_custkey
           and l_orderkey = o_orderkey
           and o_orderdate < '1995-03-15'
           and l_shipdate > '1995-03-15'
         group by l_orderkey, o_orderdate, o_shippriority
         order by revenue desc, o_orderdate
         limit 10"
    }

    /// Local supplier volume query, TPC-H Q5
    pub const fn tpch_q5() -> &'static str {
        "select n_name, sum(l_extendedprice * (1 - l_discount)) as revenue
         from customer c
         join orders o on c.c_custkey = o.o_custkey
         join lineitem l on l.l_orderkey = o.o_orderkey
         join supplier s on l.l_suppkey = s.s_suppkey and c.c_nationkey = s.s_nationkey
         join nation n on s.s_nationkey = n.n_nationkey
         join region r on n.n_regionkey = r.r_regionkey
         where r.r_name = 'ASIA'
         group by n_name
         order by revenue desc"
    }

    /// CTE over orders
    pub const fn with_cte() -> &'static str {
        "with big_orders as (
             select o_custkey, o_totalprice from orders where o_totalprice > 100000
         )
         select c.c_name, b.o_totalprice
         from customer c
         join big_orders b on b.o_custkey = c.c_custkey"
    }

    /// A first statement with a syntax error followed by a valid one
    pub const fn broken_then_valid() -> &'static str {
        "select from where; select n_name from nation"
    }
}

/// Byte offset of the cursor marker
pub fn cursor_position(input: &str) -> Option<u32> {
    input.find(CURSOR_MARKER).map(|offset| offset as u32)
}

/// Remove the cursor marker
pub fn remove_cursor_marker(input: &str) -> String {
    input.replacen(CURSOR_MARKER, "", 1)
}

/// Scan, parse and analyze `text` with the builtin functions
pub fn analyze_text(catalog: &Catalog, entry_id: CatalogEntryId, text: &str) -> AnalyzedScript {
    let parsed = Arc::new(parse(Arc::new(scan(text, 0))));
    Analyzer::analyze(parsed, catalog, entry_id, &FunctionRegistry::new())
}

/// Catalog with the TPC-H schema loaded as script `entry_id`
pub fn tpch_catalog(entry_id: CatalogEntryId) -> Catalog {
    let mut catalog = Catalog::new();
    let schema = analyze_text(&catalog, entry_id, SqlFixtures::tpch_schema());
    catalog
        .load_script(entry_id, u64::from(entry_id), 0, schema.table_declarations)
        .unwrap_or_else(|e| panic!("failed to load TPC-H schema: {e}"));
    catalog
}
